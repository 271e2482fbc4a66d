use anyhow::Result;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tfidf_core::persist::{load_index, save_index, IndexPaths};
use tfidf_core::{
    is_indexable, BuildOptions, CoreError, DfMode, DocId, FsDocumentSource, IndexBuildReport, IndexBuilder,
    DiscardVectorSink, IndexHandle, PlainTextExtractor, QueryEngine, QueryOptions, SledVectorSink, VectorSink,
};
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub index_dir: PathBuf,
    pub data_dir: PathBuf,
    pub vectors_path: Option<PathBuf>,
    pub admin_token: Option<String>,
    pub result_cap: usize,
    pub df_mode: DfMode,
}

impl AppConfig {
    pub fn new(index_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            data_dir: data_dir.into(),
            vectors_path: None,
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            result_cap: tfidf_core::query::DEFAULT_RESULT_CAP,
            df_mode: DfMode::Distinct,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub index: Arc<IndexHandle>,
    sink: Arc<dyn VectorSink>,
    build_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Opens the vector store and loads a previously saved index if one exists.
    pub fn open(config: AppConfig) -> Result<Self> {
        let sink: Arc<dyn VectorSink> = match &config.vectors_path {
            Some(path) => Arc::new(SledVectorSink::open(path)?),
            None => Arc::new(DiscardVectorSink),
        };
        let paths = IndexPaths::new(&config.index_dir);
        let index = if paths.has_saved_index() {
            IndexHandle::with_index(load_index(&paths)?)
        } else {
            tracing::warn!(index_dir = %config.index_dir.display(), "no saved index, searches fail until a build runs");
            IndexHandle::new()
        };
        Ok(Self { config: Arc::new(config), index: Arc::new(index), sink, build_lock: Arc::new(Mutex::new(())) })
    }

    /// Build from the data directory, save, then publish. One build at a time:
    /// the lock guard moves into the blocking task, so it is held until the
    /// build finishes even if the caller stops waiting.
    pub async fn rebuild(&self) -> Result<IndexBuildReport, ApiError> {
        let guard = Arc::clone(&self.build_lock)
            .try_lock_owned()
            .map_err(|_| ApiError::Conflict("an index build is already running".into()))?;
        let state = self.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            state.rebuild_blocking()
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
    }

    fn rebuild_blocking(&self) -> tfidf_core::Result<IndexBuildReport> {
        let options = BuildOptions { df_mode: self.config.df_mode, ..BuildOptions::default() };
        let (index, report) = IndexBuilder::new(&PlainTextExtractor, self.sink.as_ref())
            .with_options(options)
            .build_from_source(&FsDocumentSource, &self.config.data_dir, &is_indexable)?;
        save_index(&IndexPaths::new(&self.config.index_dir), &index)?;
        self.index.publish(index);
        Ok(report)
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            e if e.is_retryable() => ApiError::ServiceUnavailable(e.to_string()),
            CoreError::QueryParse(_) | CoreError::DegenerateCorpus => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_matches: usize,
    pub elapsed_millis: u64,
    pub hits: Vec<SearchHitView>,
}

#[derive(Serialize)]
pub struct SearchHitView {
    pub doc_id: DocId,
    pub document_id: String,
    pub file_name: String,
    pub score: f32,
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ready", get(ready_handler))
        .route("/api/search", get(search_handler))
        .route("/api/index", post(index_handler))
        .route("/api/doc/:doc_id", get(doc_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let index = state.index.snapshot()?;
    let options = QueryOptions { result_cap: state.config.result_cap, ..QueryOptions::default() };
    let k = params.k.unwrap_or(options.result_cap).clamp(1, MAX_K);
    let result = QueryEngine::new(&index).with_options(options).search_top(&params.query, k)?;

    let hits = result
        .hits
        .into_iter()
        .map(|h| SearchHitView {
            file_name: index.doc(h.doc_id).map(|m| m.file_name.clone()).unwrap_or_default(),
            doc_id: h.doc_id,
            document_id: h.document_id,
            score: h.score,
        })
        .collect();
    tracing::info!(query = %params.query, total_matches = result.total_matches, elapsed_millis = result.elapsed_millis, "search");
    Ok(Json(SearchResponse {
        query: params.query,
        total_matches: result.total_matches,
        elapsed_millis: result.elapsed_millis,
        hits,
    }))
}

pub async fn ready_handler(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    if state.index.is_ready() {
        Ok("ready")
    } else {
        Err(CoreError::IndexNotReady.into())
    }
}

pub async fn index_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<IndexBuildReport>, ApiError> {
    authorize(&state, &headers)?;
    let report = state.rebuild().await?;
    Ok(Json(report))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, ApiError> {
    let index = state.index.snapshot()?;
    let meta = index.doc(doc_id).ok_or_else(|| ApiError::NotFound(format!("document {doc_id} not found")))?;
    let terms = index.vector(doc_id).map(|v| v.len()).unwrap_or(0);
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "document_id": meta.document_id,
        "file_name": meta.file_name,
        "content_type": meta.content_type,
        "term_count": meta.term_count,
        "distinct_terms": terms,
    })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.config.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}
