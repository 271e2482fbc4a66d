use std::path::PathBuf;

/// Failures raised by the indexing and ranking engine.
///
/// Per-document failures (`Extraction`, `Storage`) are contained by the index
/// builder and only counted in its report. Corpus-wide failures abort the
/// operation and reach the caller.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("could not extract text from {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    #[error("cannot build an index over an empty document set")]
    DegenerateCorpus,

    #[error("vector sink rejected document {document_id}: {reason}")]
    Storage { document_id: String, reason: String },

    #[error("malformed query: {0}")]
    QueryParse(String),

    #[error("no index has been published yet")]
    IndexNotReady,

    #[error("index build cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Sled(#[from] sled::Error),
}

impl CoreError {
    /// Whether the caller may retry the same request later and expect success.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::IndexNotReady)
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
