//! Cache Settings
//!
//! Process-wide settings for the fallback cache. Loaded from environment
//! variables with defaults suitable for a single local instance.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

// ============================================================================
// DEFAULTS
// ============================================================================

/// Default snapshot TTL (recorded, not enforced).
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default LMDB map size in megabytes.
pub const DEFAULT_STORE_MAX_SIZE_MB: usize = 64;

/// Largest map size, in megabytes, whose byte count fits in a `usize`.
pub const MAX_STORE_SIZE_MB: usize = usize::MAX / (1024 * 1024);

// ============================================================================
// CACHE SETTINGS
// ============================================================================

/// Settings shared by the resolvers and the stores they are built on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// TTL written into each module snapshot's `expires_at`.
    pub snapshot_ttl: Duration,

    /// Root directory of the file mirror. Each category gets a subdirectory.
    pub mirror_root: PathBuf,

    /// Directory holding the LMDB snapshot environments.
    pub store_dir: PathBuf,

    /// LMDB map size in megabytes.
    pub store_max_size_mb: usize,

    /// Whether a "not found" document fetch falls back to cached copies.
    ///
    /// `true` serves a stale document even if it was removed upstream.
    /// `false` treats not-found as final.
    pub document_not_found_falls_back: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            snapshot_ttl: DEFAULT_SNAPSHOT_TTL,
            mirror_root: PathBuf::from(".cache/keepsake"),
            store_dir: PathBuf::from(".cache/keepsake/lmdb"),
            store_max_size_mb: DEFAULT_STORE_MAX_SIZE_MB,
            document_not_found_falls_back: true,
        }
    }
}

impl CacheSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create CacheSettings from environment variables.
    ///
    /// Environment variables:
    /// - `KEEPSAKE_SNAPSHOT_TTL_SECS`: Snapshot TTL in seconds (default: 86400)
    /// - `KEEPSAKE_MIRROR_ROOT`: File mirror root (default: .cache/keepsake)
    /// - `KEEPSAKE_STORE_DIR`: LMDB directory (default: .cache/keepsake/lmdb)
    /// - `KEEPSAKE_STORE_MAX_MB`: LMDB map size (default: 64)
    /// - `KEEPSAKE_DOCUMENT_NOT_FOUND_FALLS_BACK`: "true" or "false" (default: true)
    ///
    /// Unparsable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let snapshot_ttl = lookup("KEEPSAKE_SNAPSHOT_TTL_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.snapshot_ttl);

        let mirror_root = lookup("KEEPSAKE_MIRROR_ROOT")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.mirror_root);

        let store_dir = lookup("KEEPSAKE_STORE_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.store_dir);

        let store_max_size_mb = lookup("KEEPSAKE_STORE_MAX_MB")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.store_max_size_mb);

        let document_not_found_falls_back = lookup("KEEPSAKE_DOCUMENT_NOT_FOUND_FALLS_BACK")
            .map(|s| s.trim().to_lowercase() != "false")
            .unwrap_or(defaults.document_not_found_falls_back);

        Self {
            snapshot_ttl,
            mirror_root,
            store_dir,
            store_max_size_mb,
            document_not_found_falls_back,
        }
    }

    /// Set the snapshot TTL.
    pub fn with_snapshot_ttl(mut self, ttl: Duration) -> Self {
        self.snapshot_ttl = ttl;
        self
    }

    /// Set the mirror root.
    pub fn with_mirror_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.mirror_root = root.into();
        self
    }

    /// Set the LMDB directory.
    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = dir.into();
        self
    }

    /// Set the LMDB map size.
    pub fn with_store_max_size_mb(mut self, size_mb: usize) -> Self {
        self.store_max_size_mb = size_mb;
        self
    }

    /// Choose how document not-found results are handled.
    pub fn with_document_not_found_falls_back(mut self, enabled: bool) -> Self {
        self.document_not_found_falls_back = enabled;
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snapshot_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "snapshot_ttl".to_string(),
                value: "0s".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.store_max_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "store_max_size_mb".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.store_max_size_mb > MAX_STORE_SIZE_MB {
            return Err(ConfigError::InvalidValue {
                field: "store_max_size_mb".to_string(),
                value: self.store_max_size_mb.to_string(),
                reason: format!("must be at most {}", MAX_STORE_SIZE_MB),
            });
        }
        Ok(())
    }

    /// LMDB environment directory for one snapshot category.
    pub fn store_path(&self, category: &str) -> PathBuf {
        self.store_dir.join(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = CacheSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.snapshot_ttl, DEFAULT_SNAPSHOT_TTL);
        assert!(settings.document_not_found_falls_back);
    }

    #[test]
    fn test_from_lookup_reads_every_variable() {
        let settings = CacheSettings::from_lookup(lookup_from(&[
            ("KEEPSAKE_SNAPSHOT_TTL_SECS", "120"),
            ("KEEPSAKE_MIRROR_ROOT", "/var/cache/site"),
            ("KEEPSAKE_STORE_DIR", "/var/lib/site/lmdb"),
            ("KEEPSAKE_STORE_MAX_MB", "256"),
            ("KEEPSAKE_DOCUMENT_NOT_FOUND_FALLS_BACK", "FALSE"),
        ]));

        assert_eq!(settings.snapshot_ttl, Duration::from_secs(120));
        assert_eq!(settings.mirror_root, PathBuf::from("/var/cache/site"));
        assert_eq!(settings.store_dir, PathBuf::from("/var/lib/site/lmdb"));
        assert_eq!(settings.store_max_size_mb, 256);
        assert!(!settings.document_not_found_falls_back);
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let settings = CacheSettings::from_lookup(lookup_from(&[
            ("KEEPSAKE_SNAPSHOT_TTL_SECS", "soon"),
            ("KEEPSAKE_STORE_MAX_MB", "-4"),
            ("KEEPSAKE_MIRROR_ROOT", "  "),
        ]));
        assert_eq!(settings, CacheSettings::default());
    }

    #[test]
    fn test_builder() {
        let settings = CacheSettings::new()
            .with_snapshot_ttl(Duration::from_secs(30))
            .with_mirror_root("/tmp/mirror")
            .with_store_dir("/tmp/store")
            .with_store_max_size_mb(8)
            .with_document_not_found_falls_back(false);

        assert_eq!(settings.snapshot_ttl, Duration::from_secs(30));
        assert_eq!(settings.mirror_root, PathBuf::from("/tmp/mirror"));
        assert_eq!(settings.store_dir, PathBuf::from("/tmp/store"));
        assert_eq!(settings.store_max_size_mb, 8);
        assert!(!settings.document_not_found_falls_back);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let zero_ttl = CacheSettings::new().with_snapshot_ttl(Duration::ZERO);
        assert!(matches!(
            zero_ttl.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "snapshot_ttl"
        ));

        let zero_size = CacheSettings::new().with_store_max_size_mb(0);
        assert!(zero_size.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_map_size_that_overflows() {
        let huge = CacheSettings::from_lookup(lookup_from(&[(
            "KEEPSAKE_STORE_MAX_MB",
            &usize::MAX.to_string(),
        )]));
        assert_eq!(huge.store_max_size_mb, usize::MAX);
        assert!(matches!(
            huge.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "store_max_size_mb"
        ));

        let largest = CacheSettings::new().with_store_max_size_mb(MAX_STORE_SIZE_MB);
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn test_store_path_is_per_category() {
        let settings = CacheSettings::new().with_store_dir("/var/lib/site/lmdb");
        assert_eq!(
            settings.store_path("modules"),
            PathBuf::from("/var/lib/site/lmdb/modules")
        );
    }
}
