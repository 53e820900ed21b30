//! Snapshot invalidation for content-mutation workflows.
//!
//! Only the durable store is touched. The file mirror keeps whatever it had
//! until the next successful fetch overwrites it, so a failed fetch right
//! after a purge can still serve the pre-edit mirror copy.

use std::sync::Arc;

use keepsake_core::{CacheKey, CacheResult};
use tracing::{debug, info};

use super::traits::SnapshotStore;

/// Deletes durable snapshots by key.
pub struct SnapshotInvalidator<S: SnapshotStore> {
    store: Arc<S>,
}

impl<S: SnapshotStore> SnapshotInvalidator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Delete the snapshot for `key`.
    ///
    /// Idempotent: a missing row is success. Any other store failure is
    /// returned to the caller.
    pub async fn purge(&self, key: &CacheKey) -> CacheResult<()> {
        match self.store.delete(key).await {
            Ok(()) => {
                info!(key = %key, "snapshot purged");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(key = %key, "no snapshot to purge");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Purge several keys, stopping at the first failure.
    pub async fn purge_all<'a, I>(&self, keys: I) -> CacheResult<()>
    where
        I: IntoIterator<Item = &'a CacheKey>,
    {
        for key in keys {
            self.purge(key).await?;
        }
        Ok(())
    }
}

impl<S: SnapshotStore> Clone for SnapshotInvalidator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemorySnapshotStore;
    use keepsake_core::{CacheError, Snapshot, StoreError};
    use serde_json::json;

    fn key(raw: &str) -> CacheKey {
        CacheKey::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_purge_deletes_row() {
        let store = Arc::new(InMemorySnapshotStore::new());
        store.insert(Snapshot::document(key("EDUCATION"), json!([])));
        let invalidator = SnapshotInvalidator::new(Arc::clone(&store));

        invalidator.purge(&key("EDUCATION")).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_purge_is_idempotent() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let invalidator = SnapshotInvalidator::new(store);

        invalidator.purge(&key("EDUCATION")).await.unwrap();
        invalidator.purge(&key("EDUCATION")).await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_propagates_backend_failure() {
        let store = Arc::new(InMemorySnapshotStore::new());
        store.fail_deletes.set(true);
        let invalidator = SnapshotInvalidator::new(store);

        let err = invalidator.purge(&key("EDUCATION")).await.unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Backend { .. })));
    }

    #[tokio::test]
    async fn test_purge_all_clears_each_key() {
        let store = Arc::new(InMemorySnapshotStore::new());
        store.insert(Snapshot::document(key("EDUCATION"), json!([])));
        store.insert(Snapshot::document(key("RTI"), json!([])));
        let invalidator = SnapshotInvalidator::new(Arc::clone(&store));

        let keys = [key("EDUCATION"), key("RTI"), key("AWARDS")];
        invalidator.purge_all(&keys).await.unwrap();
        assert!(store.is_empty());
    }
}
