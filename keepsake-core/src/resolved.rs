//! Resolve results and the response envelope built from them.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// The caller's fetch succeeded during this resolve.
    Fetch,
    /// The durable snapshot store.
    Snapshot,
    /// The local file mirror.
    Mirror,
}

/// Value returned by a resolve.
///
/// `stale` is false only when this call's own fetch produced `data`. When a
/// fallback tier answered, the fetch failure (if any) rides along in `error`
/// for observability instead of being raised.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T, E> {
    pub data: T,
    pub stale: bool,
    pub error: Option<E>,
    pub tier: Tier,
}

impl<T, E> Resolved<T, E> {
    /// Result of a successful fetch in this call.
    pub fn fresh(data: T) -> Self {
        Self {
            data,
            stale: false,
            error: None,
            tier: Tier::Fetch,
        }
    }

    /// Result served from a fallback tier.
    pub fn stale(data: T, tier: Tier, error: Option<E>) -> Self {
        Self {
            data,
            stale: true,
            error,
            tier,
        }
    }

    /// Consume the wrapper and return the data.
    pub fn into_data(self) -> T {
        self.data
    }

    /// Transform the data, keeping staleness metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U, E> {
        Resolved {
            data: f(self.data),
            stale: self.stale,
            error: self.error,
            tier: self.tier,
        }
    }
}

impl<T, E: Display> Resolved<T, E> {
    /// Shape exposed by content-read handlers.
    pub fn into_envelope(self) -> ResponseEnvelope<T> {
        ResponseEnvelope {
            data: self.data,
            meta: ResponseMeta {
                stale: self.stale,
                error: self.error.map(|e| e.to_string()),
            },
        }
    }
}

/// Response body for content reads: data plus staleness metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub data: T,
    pub meta: ResponseMeta,
}

/// Metadata attached to every content-read response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fresh_is_not_stale() {
        let r: Resolved<_, String> = Resolved::fresh(vec![1, 2]);
        assert!(!r.stale);
        assert!(r.error.is_none());
        assert_eq!(r.tier, Tier::Fetch);
    }

    #[test]
    fn test_stale_carries_error() {
        let r = Resolved::stale(1, Tier::Mirror, Some("db down".to_string()));
        assert!(r.stale);
        assert_eq!(r.tier, Tier::Mirror);
        assert_eq!(r.error.as_deref(), Some("db down"));
    }

    #[test]
    fn test_map_keeps_metadata() {
        let r = Resolved::stale(2, Tier::Snapshot, Some("timeout".to_string())).map(|n| n * 10);
        assert_eq!(r.data, 20);
        assert!(r.stale);
        assert_eq!(r.tier, Tier::Snapshot);
    }

    #[test]
    fn test_envelope_serialization() {
        let fresh: Resolved<_, String> = Resolved::fresh(json!(["R1"]));
        assert_eq!(
            serde_json::to_value(fresh.into_envelope()).unwrap(),
            json!({"data": ["R1"], "meta": {"stale": false}})
        );

        let stale = Resolved::stale(json!(["R1"]), Tier::Snapshot, Some("db down".to_string()));
        assert_eq!(
            serde_json::to_value(stale.into_envelope()).unwrap(),
            json!({"data": ["R1"], "meta": {"stale": true, "error": "db down"}})
        );
    }
}
