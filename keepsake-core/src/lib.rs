//! Keepsake Core - Cache Types
//!
//! Pure data structures for the fallback cache: keys, snapshots, resolve
//! results, settings and errors. No I/O lives here; the tiers and resolvers
//! are in keepsake-storage.

pub mod config;
pub mod error;
pub mod key;
pub mod resolved;
pub mod snapshot;

pub use config::{
    CacheSettings, DEFAULT_SNAPSHOT_TTL, DEFAULT_STORE_MAX_SIZE_MB, MAX_STORE_SIZE_MB,
};
pub use error::{
    CacheError, CacheResult, ConfigError, KeyError, MirrorError, PersistenceError, StoreError,
};
pub use key::{sanitize_key, CacheKey, MAX_KEY_LEN};
pub use resolved::{ResponseEnvelope, ResponseMeta, Resolved, Tier};
pub use snapshot::{canonical_json, checksum, Snapshot, Timestamp};
