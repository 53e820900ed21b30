//! Keepsake Storage - Fallback Tiers and Resolvers
//!
//! Serves content reads when the primary source is down by falling back to
//! the last known-good payload. The types these operate on live in
//! keepsake-core.

pub mod cache;

pub use cache::{
    best_effort, DocumentResolver, FailureSwitch, FallbackChain, FileMirror, FileSystem,
    InMemoryFileSystem, InMemorySnapshotStore, LmdbSnapshotStore, LmdbStoreError,
    LocalFileSystem, ModuleResolver, SnapshotInvalidator, SnapshotStore, DOCUMENTS_CATEGORY,
    MODULES_CATEGORY,
};
