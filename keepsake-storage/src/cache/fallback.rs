//! The ordered fallback chain: durable snapshot store first, then the mirror.
//!
//! Neither tier knows about staleness or about the other tier. Every failure
//! here (unreachable store, undecodable row, unreadable or torn file) is a
//! tier miss and the walk moves on.

use std::fmt::Display;
use std::sync::Arc;

use chrono::Utc;
use keepsake_core::{CacheKey, Tier};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::file_mirror::FileMirror;
use super::traits::{FileSystem, SnapshotStore};

/// Durable store and file mirror, read in that order.
pub struct FallbackChain<S: SnapshotStore, F: FileSystem> {
    store: Arc<S>,
    mirror: FileMirror<F>,
}

impl<S: SnapshotStore, F: FileSystem> FallbackChain<S, F> {
    pub fn new(store: Arc<S>, mirror: FileMirror<F>) -> Self {
        Self { store, mirror }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn mirror(&self) -> &FileMirror<F> {
        &self.mirror
    }

    /// Walk both tiers, returning the first usable payload and its tier.
    ///
    /// `cause` is the reason the walk started; it is only logged.
    pub async fn walk<T, C>(&self, key: &CacheKey, cause: Option<&C>) -> Option<(T, Tier)>
    where
        T: DeserializeOwned,
        C: Display + ?Sized,
    {
        let cause = cause
            .map(|c| c.to_string())
            .unwrap_or_else(|| "not found".to_string());

        if let Some(data) = self.read_snapshot(key).await {
            warn!(key = %key, tier = "snapshot", cause = %cause, "serving stale data");
            return Some((data, Tier::Snapshot));
        }

        if let Some(data) = self.read_mirror(key).await {
            warn!(key = %key, tier = "mirror", cause = %cause, "serving stale data");
            return Some((data, Tier::Mirror));
        }

        debug!(key = %key, "both fallback tiers missed");
        None
    }

    /// Read the durable snapshot's payload. Any failure is a miss.
    pub async fn read_snapshot<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let snapshot = match self.store.get(key).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!(key = %key, tier = "snapshot", "tier miss");
                return None;
            }
            Err(e) => {
                warn!(key = %key, tier = "snapshot", error = %e, "tier unreadable; treating as miss");
                return None;
            }
        };

        if snapshot.payload.is_null() {
            debug!(key = %key, tier = "snapshot", "null payload; treating as miss");
            return None;
        }

        let now = Utc::now();
        debug!(
            key = %key,
            expired = snapshot.is_expired(now),
            age_secs = snapshot.age(now).map(|a| a.as_secs()),
            "snapshot found"
        );
        decode(key, "snapshot", snapshot.payload)
    }

    /// Read and parse the mirror file. Any failure is a miss.
    pub async fn read_mirror<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.mirror.read(key).await {
            Ok(Some(Value::Null)) => {
                debug!(key = %key, tier = "mirror", "null payload; treating as miss");
                None
            }
            Ok(Some(value)) => decode(key, "mirror", value),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, tier = "mirror", error = %e, "tier unreadable; treating as miss");
                None
            }
        }
    }
}

fn decode<T: DeserializeOwned>(key: &CacheKey, tier: &'static str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(data) => Some(data),
        Err(e) => {
            warn!(key = %key, tier, error = %e, "payload has unexpected shape; treating as miss");
            None
        }
    }
}

impl<S: SnapshotStore, F: FileSystem> Clone for FallbackChain<S, F> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            mirror: self.mirror.clone(),
        }
    }
}
