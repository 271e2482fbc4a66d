use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tfidf_core::persist::{save_index, IndexPaths};
use tfidf_core::{DocMeta, InvertedIndex, TfIdfVector};
use tfidf_server::{build_app, ApiError, AppConfig, AppState};
use tower::ServiceExt;

const TOKEN: &str = "secret";

fn write_corpus(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("doc1.txt"), "cat dog cat").unwrap();
    fs::write(dir.join("doc2.txt"), "dog bird").unwrap();
}

fn config(root: &TempDir) -> AppConfig {
    let mut config = AppConfig::new(root.path().join("index"), root.path().join("data"));
    config.admin_token = Some(TOKEN.into());
    config
}

fn build_tiny_index(dir: &Path) {
    // Weights precomputed so that doc0 outranks doc1 on "rust".
    let mut index = InvertedIndex::new();
    for (id, weight) in [("doc0.txt", 0.8f32), ("doc1.txt", 0.6f32)] {
        let meta = DocMeta { document_id: id.into(), file_name: id.into(), content_type: "text/plain".into(), term_count: 3 };
        index.insert(meta, &TfIdfVector::from([("rust".to_string(), weight)]));
    }
    save_index(&IndexPaths::new(dir), &index).unwrap();
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_index(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/api/index");
    if let Some(t) = token {
        builder = builder.header("X-ADMIN-TOKEN", t);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let root = tempdir().unwrap();
    build_tiny_index(&root.path().join("index"));
    let app = build_app(AppState::open(config(&root)).unwrap());

    let (status, body) = call(app, get("/api/search?query=Rust&k=2")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_matches"], 2);
    let arr = json["hits"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["document_id"], "doc0.txt");
    assert_eq!(arr[1]["document_id"], "doc1.txt");
}

#[tokio::test]
async fn search_before_any_build_is_unavailable() {
    let root = tempdir().unwrap();
    let app = build_app(AppState::open(config(&root)).unwrap());

    let (status, body) = call(app, get("/api/search?query=cat")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("no index"));
}

#[tokio::test]
async fn index_endpoint_requires_token() {
    let root = tempdir().unwrap();
    write_corpus(&root.path().join("data"));
    let app = build_app(AppState::open(config(&root)).unwrap());

    let (status, _) = call(app.clone(), post_index(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(app, post_index(Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn build_then_search_zero_weight_hit() {
    let root = tempdir().unwrap();
    write_corpus(&root.path().join("data"));
    let state = AppState::open(config(&root)).unwrap();
    let app = build_app(state.clone());

    let (status, body) = call(app.clone(), post_index(Some(TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    let report: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["documents_indexed"], 2);
    assert!(IndexPaths::new(root.path().join("index")).exists());

    let (status, body) = call(app.clone(), get("/api/search?query=cat")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_matches"], 1);
    assert_eq!(json["hits"][0]["document_id"], "doc1.txt");
    assert_eq!(json["hits"][0]["score"], 0.0);

    let (status, body) = call(app.clone(), get("/api/search?query=")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_matches"], 0);

    let doc_id = state.index.snapshot().unwrap().doc_by_external_id("doc2.txt").unwrap().0;
    let (status, body) = call(app.clone(), get(&format!("/api/doc/{doc_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["file_name"], "doc2.txt");
    assert_eq!(json["distinct_terms"], 2);

    let (status, _) = call(app, get("/api/doc/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn build_over_empty_directory_is_rejected() {
    let root = tempdir().unwrap();
    fs::create_dir_all(root.path().join("data")).unwrap();
    let app = build_app(AppState::open(config(&root)).unwrap());

    let (status, _) = call(app.clone(), post_index(Some(TOKEN))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call(app, get("/api/search?query=cat")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn saved_index_is_served_after_restart() {
    let root = tempdir().unwrap();
    write_corpus(&root.path().join("data"));
    let first = AppState::open(config(&root)).unwrap();
    first.rebuild().await.unwrap();

    let app = build_app(AppState::open(config(&root)).unwrap());
    let (status, body) = call(app, get("/api/search?query=bird")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["hits"][0]["document_id"], "doc2.txt");
}

#[tokio::test]
async fn malformed_k_is_a_json_bad_request() {
    let root = tempdir().unwrap();
    build_tiny_index(&root.path().join("index"));
    let app = build_app(AppState::open(config(&root)).unwrap());

    let (status, body) = call(app, get("/api/search?query=rust&k=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn ready_reflects_published_index() {
    let root = tempdir().unwrap();
    write_corpus(&root.path().join("data"));
    let state = AppState::open(config(&root)).unwrap();
    let app = build_app(state.clone());

    let (status, _) = call(app.clone(), get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    state.rebuild().await.unwrap();
    let (status, body) = call(app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ready");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_rebuild_keeps_build_lock_until_done() {
    let root = tempdir().unwrap();
    let data = root.path().join("data");
    fs::create_dir_all(&data).unwrap();
    let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa ".repeat(50);
    for i in 0..2000 {
        fs::write(data.join(format!("doc{i:04}.txt")), &text).unwrap();
    }
    let state = AppState::open(config(&root)).unwrap();
    let app = build_app(state.clone());

    // caller gives up while the build keeps running on the blocking pool
    let abandoned = tokio::time::timeout(Duration::from_millis(1), state.rebuild()).await;
    assert!(abandoned.is_err());

    let err = state.rebuild().await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
    let (status, _) = call(app, post_index(Some(TOKEN))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    for _ in 0..600 {
        if state.index.is_ready() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(state.index.is_ready());
}
