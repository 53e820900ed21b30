//! LMDB-backed snapshot store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep one JSON-encoded
//! [`Snapshot`] row per cache key in a memory-mapped, crash-safe file.
//!
//! # Key Format
//!
//! Rows are keyed by the raw UTF-8 bytes of the [`CacheKey`]. Each store owns
//! its own environment directory, so module snapshots and document snapshots
//! live in separate environments and never share a key space.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get` and `keys`
//! - Write transactions for `upsert` and `delete`
//!
//! A single write transaction per upsert makes "last writer wins" the outcome
//! of concurrent writes to the same key.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use keepsake_core::{CacheKey, Snapshot, StoreError};
use tracing::{debug, warn};

use super::traits::SnapshotStore;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert LmdbStoreError to StoreError.
impl From<LmdbStoreError> for StoreError {
    fn from(e: LmdbStoreError) -> Self {
        StoreError::Backend {
            reason: e.to_string(),
        }
    }
}

/// LMDB-backed snapshot store.
///
/// # Example
///
/// ```ignore
/// use keepsake_core::CacheKey;
/// use keepsake_storage::LmdbSnapshotStore;
///
/// let store = LmdbSnapshotStore::open("/var/lib/site/lmdb/modules", 64)?;
/// let row = store.get(&CacheKey::new("EDUCATION")?).await?;
/// ```
pub struct LmdbSnapshotStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    /// Directory of the environment, for diagnostics.
    path: PathBuf,
}

impl LmdbSnapshotStore {
    /// Open or create a snapshot store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_size_mb` does not fit in a byte count
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        let map_size = max_size_mb.checked_mul(1024 * 1024).ok_or_else(|| {
            LmdbStoreError::EnvOpen(format!("map size of {} MB overflows", max_size_mb))
        })?;

        std::fs::create_dir_all(&path)?;

        // SAFETY: each store owns its directory, and the environment is
        // opened once per directory per process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Directory backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn transaction(e: heed::Error) -> StoreError {
    LmdbStoreError::Transaction(e.to_string()).into()
}

#[async_trait]
impl SnapshotStore for LmdbSnapshotStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Snapshot>, StoreError> {
        let rtxn = self.env.read_txn().map_err(transaction)?;

        match self.db.get(&rtxn, key.as_bytes()).map_err(transaction)? {
            Some(bytes) => {
                let snapshot: Snapshot =
                    serde_json::from_slice(bytes).map_err(|e| StoreError::Decode {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?;
                debug!(key = %key, "snapshot hit");
                Ok(Some(snapshot))
            }
            None => {
                debug!(key = %key, "snapshot miss");
                Ok(None)
            }
        }
    }

    async fn upsert(&self, mut snapshot: Snapshot) -> Result<(), StoreError> {
        snapshot.updated_at = Utc::now();

        let bytes = serde_json::to_vec(&snapshot).map_err(|e| StoreError::Encode {
            key: snapshot.key.to_string(),
            reason: e.to_string(),
        })?;

        let mut wtxn = self.env.write_txn().map_err(transaction)?;

        self.db
            .put(&mut wtxn, snapshot.key.as_bytes(), &bytes)
            .map_err(transaction)?;

        wtxn.commit().map_err(transaction)?;

        debug!(key = %snapshot.key, size = bytes.len(), "snapshot upserted");
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(transaction)?;

        let deleted = self
            .db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(transaction)?;

        wtxn.commit().map_err(transaction)?;

        if deleted {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                key: key.to_string(),
            })
        }
    }

    async fn keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        let rtxn = self.env.read_txn().map_err(transaction)?;

        let mut keys = Vec::new();
        for result in self.db.iter(&rtxn).map_err(transaction)? {
            let (raw, _) = result.map_err(transaction)?;
            match std::str::from_utf8(raw).map(CacheKey::new) {
                Ok(Ok(key)) => keys.push(key),
                _ => warn!(path = %self.path.display(), "skipping undecodable snapshot key"),
            }
        }

        Ok(keys)
    }
}
