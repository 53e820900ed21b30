//! Error types for keepsake operations

use thiserror::Error;

/// Key validation errors.
///
/// These are caller mistakes. They surface when a key is constructed, before
/// any tier is read or written.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Cache key is empty")]
    Empty,

    #[error("Cache key is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("Cache key contains a control character at byte {position}")]
    ControlCharacter { position: usize },
}

/// Durable snapshot store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("No snapshot stored for key {key}")]
    NotFound { key: String },

    #[error("Store backend failed: {reason}")]
    Backend { reason: String },

    #[error("Failed to encode snapshot for {key}: {reason}")]
    Encode { key: String, reason: String },

    #[error("Failed to decode snapshot for {key}: {reason}")]
    Decode { key: String, reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Returns true if the error only says the row was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// File mirror errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MirrorError {
    #[error("Mirror I/O failed for {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to encode mirror entry {path}: {reason}")]
    Encode { path: String, reason: String },

    #[error("Mirror entry {path} is not valid JSON: {reason}")]
    Decode { path: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Failures that may happen while persisting a freshly fetched payload.
///
/// This is the closed set of failures the best-effort writer absorbs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Snapshot write failed: {0}")]
    Store(#[from] StoreError),

    #[error("Mirror write failed: {0}")]
    Mirror(#[from] MirrorError),

    #[error("Checksum failed: {reason}")]
    Checksum { reason: String },
}

/// Master error type for keepsake.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Mirror error: {0}")]
    Mirror(#[from] MirrorError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Result type alias for keepsake operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================
