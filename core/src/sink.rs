use crate::error::{CoreError, Result};
use crate::vectorize::TfIdfVector;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;

/// Durable destination for per-document TF-IDF vectors.
///
/// Failures must come back as [`CoreError::Storage`]; the builder logs them
/// and keeps going.
pub trait VectorSink: Send + Sync {
    fn store(&self, document_id: &str, vector: &TfIdfVector) -> Result<()>;
}

/// Drops every vector. Used when no vector store is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardVectorSink;

impl VectorSink for DiscardVectorSink {
    fn store(&self, _document_id: &str, _vector: &TfIdfVector) -> Result<()> {
        Ok(())
    }
}

/// Vectors kept in memory.
#[derive(Debug, Default)]
pub struct MemoryVectorSink {
    vectors: Mutex<BTreeMap<String, TfIdfVector>>,
}

impl MemoryVectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, document_id: &str) -> Option<TfIdfVector> {
        self.vectors.lock().get(document_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.vectors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.lock().is_empty()
    }
}

impl VectorSink for MemoryVectorSink {
    fn store(&self, document_id: &str, vector: &TfIdfVector) -> Result<()> {
        self.vectors.lock().insert(document_id.to_string(), vector.clone());
        Ok(())
    }
}

/// Vectors stored in a sled database, bincode-encoded and keyed by document id.
pub struct SledVectorSink {
    db: sled::Db,
}

impl SledVectorSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    pub fn load(&self, document_id: &str) -> Result<Option<TfIdfVector>> {
        match self.db.get(document_id.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl VectorSink for SledVectorSink {
    fn store(&self, document_id: &str, vector: &TfIdfVector) -> Result<()> {
        let storage = |reason: String| CoreError::Storage { document_id: document_id.to_string(), reason };
        let bytes = bincode::serialize(vector).map_err(|e| storage(e.to_string()))?;
        self.db.insert(document_id.as_bytes(), bytes).map_err(|e| storage(e.to_string()))?;
        Ok(())
    }
}
