//! Durable snapshot rows and payload checksums.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::key::CacheKey;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// The durable store's record of the last successful fetch for a key.
///
/// Module snapshots carry a checksum and timing metadata. Document snapshots
/// only carry the payload; their optional fields stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub key: CacheKey,
    pub payload: Value,
    /// Hex SHA-256 over the canonical serialization of `payload`.
    pub checksum: Option<String>,
    pub fetched_at: Option<Timestamp>,
    /// Recorded, never enforced by the resolvers.
    pub expires_at: Option<Timestamp>,
    /// Set by the store on every write.
    pub updated_at: Timestamp,
}

impl Snapshot {
    /// Snapshot of a module payload fetched at `fetched_at`, with checksum and TTL.
    pub fn module(
        key: CacheKey,
        payload: Value,
        checksum: String,
        fetched_at: Timestamp,
        ttl: Duration,
    ) -> Self {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX);
        Self {
            key,
            payload,
            checksum: Some(checksum),
            fetched_at: Some(fetched_at),
            expires_at: fetched_at.checked_add_signed(ttl),
            updated_at: fetched_at,
        }
    }

    /// Snapshot holding only a raw document.
    pub fn document(key: CacheKey, payload: Value) -> Self {
        Self {
            key,
            payload,
            checksum: None,
            fetched_at: None,
            expires_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether the recorded TTL has passed as of `now`.
    ///
    /// Snapshots without an expiry never expire. The resolvers never call
    /// this; it exists for inspection.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }

    /// Age of the payload as of `now`, if the fetch time was recorded.
    pub fn age(&self, now: Timestamp) -> Option<Duration> {
        self.fetched_at
            .and_then(|at| now.signed_duration_since(at).to_std().ok())
    }
}

/// Canonical JSON text of a value: object keys sorted, no whitespace.
///
/// Independent of serde_json's map ordering feature, so checksums are stable
/// across builds.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Hex SHA-256 of the canonical serialization of `value`.
pub fn checksum(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(value).as_bytes());
    hex::encode(hasher.finalize())
}
