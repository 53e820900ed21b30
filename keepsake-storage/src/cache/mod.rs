//! Read-through cache with two independent fallback tiers.
//!
//! A resolve always calls the caller's fetch first. On success the payload is
//! returned fresh and copied, best-effort, into a durable snapshot store and a
//! local file mirror. On failure the snapshot store is read, then the mirror,
//! and the first hit is returned marked stale.
//!
//! # Tiers
//!
//! The two tiers fail independently (a store that may be remote versus local
//! disk) and know nothing about each other:
//!
//! - [`SnapshotStore`]: one row per key with payload, checksum and timing
//!   metadata. [`LmdbSnapshotStore`] and [`InMemorySnapshotStore`].
//! - [`FileMirror`] over a [`FileSystem`]: one JSON file per key.
//!   [`LocalFileSystem`] and [`InMemoryFileSystem`].
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(LmdbSnapshotStore::open(
//!     settings.store_path(MODULES_CATEGORY),
//!     settings.store_max_size_mb,
//! )?);
//! let resolver = ModuleResolver::new(store, Arc::new(LocalFileSystem), &settings)?;
//!
//! let read = resolver.resolve(&CacheKey::new("EDUCATION")?, || fetch_education(&pool)).await?;
//! let body = read.into_envelope();
//! ```

pub mod best_effort;
pub mod document;
pub mod fallback;
pub mod file_mirror;
pub mod invalidation;
pub mod lmdb_backend;
pub mod memory;
pub mod read_through;
pub mod traits;

pub use best_effort::best_effort;
pub use document::DocumentResolver;
pub use fallback::FallbackChain;
pub use file_mirror::{FileMirror, LocalFileSystem, DOCUMENTS_CATEGORY, MODULES_CATEGORY};
pub use invalidation::SnapshotInvalidator;
pub use lmdb_backend::{LmdbSnapshotStore, LmdbStoreError};
pub use memory::{FailureSwitch, InMemoryFileSystem, InMemorySnapshotStore};
pub use read_through::ModuleResolver;
pub use traits::{FileSystem, SnapshotStore};
