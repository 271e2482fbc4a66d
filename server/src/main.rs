use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tfidf_core::DfMode;
use tfidf_server::{build_app, AppConfig, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Directory of documents indexed by POST /api/index
    #[arg(long, default_value = "./data")]
    data: String,
    /// sled database receiving per-document TF-IDF vectors
    #[arg(long)]
    vectors: Option<String>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Default number of hits per search
    #[arg(long, default_value_t = 10)]
    result_cap: usize,
    /// Document frequency counting: `distinct` or `occurrence`
    #[arg(long, default_value_t = DfMode::Distinct)]
    df_mode: DfMode,
    /// Build the index from the data directory before serving
    #[arg(long, default_value_t = false)]
    build_on_start: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mut config = AppConfig::new(&args.index, &args.data);
    config.vectors_path = args.vectors.map(Into::into);
    config.result_cap = args.result_cap;
    config.df_mode = args.df_mode;
    let state = AppState::open(config)?;
    if args.build_on_start {
        match state.rebuild().await {
            Ok(report) => tracing::info!(documents_indexed = report.documents_indexed, "initial build complete"),
            Err(e) => tracing::error!(error = ?e, "initial build failed"),
        }
    }
    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
