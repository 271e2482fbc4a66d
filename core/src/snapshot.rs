use crate::error::{CoreError, Result};
use crate::index::InvertedIndex;
use parking_lot::RwLock;
use std::sync::Arc;

/// The currently published index.
///
/// Builders produce a complete [`InvertedIndex`] and swap it in with
/// [`IndexHandle::publish`]; readers take an `Arc` and search without holding
/// the lock.
#[derive(Debug, Default)]
pub struct IndexHandle {
    current: RwLock<Option<Arc<InvertedIndex>>>,
}

impl IndexHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(index: InvertedIndex) -> Self {
        Self { current: RwLock::new(Some(Arc::new(index))) }
    }

    /// Replace the published index, returning the previous one.
    pub fn publish(&self, index: InvertedIndex) -> Option<Arc<InvertedIndex>> {
        self.current.write().replace(Arc::new(index))
    }

    pub fn snapshot(&self) -> Result<Arc<InvertedIndex>> {
        self.current.read().clone().ok_or(CoreError::IndexNotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_until_published() {
        let handle = IndexHandle::new();
        let err = handle.snapshot().unwrap_err();
        assert!(matches!(err, CoreError::IndexNotReady));
        assert!(err.is_retryable());

        assert!(handle.publish(InvertedIndex::new()).is_none());
        assert!(handle.is_ready());
        assert!(handle.snapshot().is_ok());
    }

    #[test]
    fn readers_keep_their_snapshot_across_publish() {
        let handle = IndexHandle::with_index(InvertedIndex::new());
        let before = handle.snapshot().unwrap();
        let previous = handle.publish(InvertedIndex::new()).unwrap();
        assert!(Arc::ptr_eq(&before, &previous));
        assert!(!Arc::ptr_eq(&before, &handle.snapshot().unwrap()));
    }
}
