use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tfidf_core::persist::{load_index, save_index, IndexPaths};
use tfidf_core::{
    is_indexable, BuildOptions, DfMode, DiscardVectorSink, FsDocumentSource, IndexBuilder, PlainTextExtractor,
    QueryEngine, SledVectorSink, VectorSink,
};
use tracing_subscriber::{fmt, EnvFilter};

use std::path::Path;

#[derive(Parser)]
#[command(name = "tfidf-indexer")]
#[command(about = "Build and query a TF-IDF inverted index over a directory of documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a directory of documents
    Build {
        /// Data directory to scan
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// sled database receiving per-document TF-IDF vectors
        #[arg(long)]
        vectors: Option<String>,
        /// Document frequency counting: `distinct` or `occurrence`
        #[arg(long, default_value_t = DfMode::Distinct)]
        df_mode: DfMode,
        /// Threads for extraction and counting
        #[arg(long, default_value_t = 1)]
        workers: usize,
    },
    /// Run one query against a saved index and print the result as JSON
    Search {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Free-text query
        #[arg(long)]
        query: String,
        /// Maximum number of hits
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, vectors, df_mode, workers } => {
            build_index(&input, &output, vectors.as_deref(), BuildOptions { df_mode, workers })
        }
        Commands::Search { index, query, k } => search_index(&index, &query, k),
    }
}

fn build_index(input: &str, output: &str, vectors: Option<&str>, options: BuildOptions) -> Result<()> {
    let sink: Box<dyn VectorSink> = match vectors {
        Some(path) => Box::new(SledVectorSink::open(path).with_context(|| format!("opening vector store {path}"))?),
        None => Box::new(DiscardVectorSink),
    };
    let (index, report) = IndexBuilder::new(&PlainTextExtractor, sink.as_ref())
        .with_options(options)
        .build_from_source(&FsDocumentSource, Path::new(input), &is_indexable)
        .with_context(|| format!("indexing {input}"))?;

    save_index(&IndexPaths::new(output), &index).with_context(|| format!("writing index to {output}"))?;
    tracing::info!(output, num_terms = index.num_terms(), "index written");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn search_index(index_dir: &str, query: &str, k: usize) -> Result<()> {
    let index = load_index(&IndexPaths::new(index_dir)).with_context(|| format!("loading index from {index_dir}"))?;
    let result = QueryEngine::new(&index).search_top(query, k)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
