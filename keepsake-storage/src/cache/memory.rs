//! In-memory tiers with failure injection.
//!
//! Used by tests and by embedders that want a process-local cache. Every
//! operation can be switched to fail on demand, so each tier's outage can be
//! simulated independently of the other.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use keepsake_core::{CacheKey, Snapshot, StoreError};

use super::traits::{FileSystem, SnapshotStore};

/// On/off switch for simulated failures.
#[derive(Debug, Default)]
pub struct FailureSwitch(AtomicBool);

impl FailureSwitch {
    pub fn set(&self, failing: bool) {
        self.0.store(failing, Ordering::SeqCst);
    }

    pub fn is_on(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SNAPSHOT STORE
// ============================================================================

/// In-memory snapshot store.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    rows: RwLock<HashMap<CacheKey, Snapshot>>,
    /// Fail `get` and `keys` with a backend error.
    pub fail_reads: FailureSwitch,
    /// Fail `upsert` with a backend error.
    pub fail_writes: FailureSwitch,
    /// Fail `delete` with a backend error.
    pub fail_deletes: FailureSwitch,
    upserts: AtomicU64,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a row directly, bypassing failure switches.
    ///
    /// Simulates a write made by another process.
    pub fn insert(&self, snapshot: Snapshot) {
        if let Ok(mut rows) = self.rows.write() {
            rows.insert(snapshot.key.clone(), snapshot);
        }
    }

    /// Peek at a row, bypassing failure switches.
    pub fn peek(&self, key: &CacheKey) -> Option<Snapshot> {
        self.rows.read().ok().and_then(|rows| rows.get(key).cloned())
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful upserts so far.
    pub fn upsert_count(&self) -> u64 {
        self.upserts.load(Ordering::SeqCst)
    }
}

fn unavailable(operation: &str) -> StoreError {
    StoreError::Backend {
        reason: format!("simulated {} failure: store unreachable", operation),
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Snapshot>, StoreError> {
        if self.fail_reads.is_on() {
            return Err(unavailable("get"));
        }
        let rows = self.rows.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(rows.get(key).cloned())
    }

    async fn upsert(&self, mut snapshot: Snapshot) -> Result<(), StoreError> {
        if self.fail_writes.is_on() {
            return Err(unavailable("upsert"));
        }
        snapshot.updated_at = Utc::now();
        let mut rows = self.rows.write().map_err(|_| StoreError::LockPoisoned)?;
        rows.insert(snapshot.key.clone(), snapshot);
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), StoreError> {
        if self.fail_deletes.is_on() {
            return Err(unavailable("delete"));
        }
        let mut rows = self.rows.write().map_err(|_| StoreError::LockPoisoned)?;
        match rows.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    async fn keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        if self.fail_reads.is_on() {
            return Err(unavailable("keys"));
        }
        let rows = self.rows.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut keys: Vec<CacheKey> = rows.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

// ============================================================================
// FILESYSTEM
// ============================================================================

/// In-memory filesystem keyed by full path.
#[derive(Debug, Default)]
pub struct InMemoryFileSystem {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
    /// Fail every read with a permission error.
    pub fail_reads: FailureSwitch,
    /// Fail every write with a storage-full style error.
    pub fail_writes: FailureSwitch,
    writes: AtomicU64,
}

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place raw bytes at a path, bypassing failure switches.
    ///
    /// Lets tests plant truncated or corrupt files.
    pub fn put_raw(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.write() {
            files.insert(path.into(), contents.into());
        }
    }

    /// Raw bytes at a path, bypassing failure switches.
    pub fn get_raw(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().ok().and_then(|f| f.get(path).cloned())
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

fn poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "filesystem lock poisoned")
}

#[async_trait]
impl FileSystem for InMemoryFileSystem {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        if self.fail_reads.is_on() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated read failure",
            ));
        }
        let files = self.files.read().map_err(|_| poisoned())?;
        files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )
        })
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if self.fail_writes.is_on() {
            return Err(io::Error::new(io::ErrorKind::Other, "simulated disk full"));
        }
        let mut files = self.files.write().map_err(|_| poisoned())?;
        files.insert(path.to_path_buf(), contents.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
