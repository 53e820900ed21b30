//! Tier traits.
//!
//! The resolvers never reach for a global client or the process filesystem.
//! Both fallback tiers are injected through these traits so each one can be
//! replaced, or made to fail, independently.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use keepsake_core::{CacheKey, Snapshot, StoreError};

/// Durable store holding the last successful payload per key.
///
/// # Contract
///
/// - At most one row exists per key; `upsert` replaces it wholesale.
/// - `upsert` sets `updated_at` on the stored row.
/// - `delete` reports a missing row as [`StoreError::NotFound`] so callers can
///   decide whether absence matters.
/// - Implementations must be safe to share across tasks. Races between
///   writers for the same key resolve as last writer wins.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Get the snapshot row for a key.
    async fn get(&self, key: &CacheKey) -> Result<Option<Snapshot>, StoreError>;

    /// Insert or replace the snapshot row for `snapshot.key`.
    async fn upsert(&self, snapshot: Snapshot) -> Result<(), StoreError>;

    /// Delete the snapshot row for a key.
    async fn delete(&self, key: &CacheKey) -> Result<(), StoreError>;

    /// List every key that currently has a row.
    async fn keys(&self) -> Result<Vec<CacheKey>, StoreError>;
}

/// Minimal filesystem used by the file mirror.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a whole file. A missing file is `io::ErrorKind::NotFound`.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Overwrite a whole file, creating parent directories as needed.
    ///
    /// No locking or atomic rename: a concurrent reader may see a torn file.
    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}
