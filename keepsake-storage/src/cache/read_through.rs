//! Read-through resolver for content modules.
//!
//! Every resolve calls the caller's fetch first. A successful fetch is
//! returned fresh and copied, best-effort, into the snapshot store (with
//! checksum and TTL) and the file mirror. A failed fetch walks the fallback
//! chain and serves the first hit as stale. When both tiers miss, the
//! original fetch error is returned untouched.
//!
//! The TTL is written into `expires_at` but never checked: staleness comes
//! only from a failed fetch.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use keepsake_core::{
    checksum, CacheKey, CacheResult, CacheSettings, PersistenceError, Resolved,
    Snapshot,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::best_effort::best_effort;
use super::fallback::FallbackChain;
use super::file_mirror::{FileMirror, MODULES_CATEGORY};
use super::invalidation::SnapshotInvalidator;
use super::traits::{FileSystem, SnapshotStore};

/// Read-through resolver for module-keyed content.
///
/// # Type Parameters
///
/// - `S`: The durable snapshot store
/// - `F`: The filesystem behind the file mirror
///
/// # Example
///
/// ```ignore
/// let resolver = ModuleResolver::new(store, fs, &settings)?;
/// let key = CacheKey::new("EDUCATION")?;
///
/// let read = resolver.resolve(&key, || db.education_rows()).await?;
/// if read.stale {
///     tracing::warn!("serving cached education rows");
/// }
/// ```
pub struct ModuleResolver<S: SnapshotStore, F: FileSystem> {
    chain: FallbackChain<S, F>,
    invalidator: SnapshotInvalidator<S>,
    /// TTL recorded on each snapshot.
    ttl: Duration,
}

impl<S: SnapshotStore, F: FileSystem> ModuleResolver<S, F> {
    /// Create a resolver mirroring into the `modules` category under
    /// `settings.mirror_root`.
    ///
    /// Fails if `settings` do not validate.
    pub fn new(store: Arc<S>, fs: Arc<F>, settings: &CacheSettings) -> CacheResult<Self> {
        settings.validate()?;
        let mirror = FileMirror::new(fs, settings.mirror_root.clone(), MODULES_CATEGORY)?;
        Ok(Self::from_parts(store, mirror, settings.snapshot_ttl))
    }

    /// Create a resolver from an existing mirror.
    pub fn from_parts(store: Arc<S>, mirror: FileMirror<F>, ttl: Duration) -> Self {
        Self {
            invalidator: SnapshotInvalidator::new(Arc::clone(&store)),
            chain: FallbackChain::new(store, mirror),
            ttl,
        }
    }

    /// The fallback chain (store and mirror) this resolver reads from.
    pub fn chain(&self) -> &FallbackChain<S, F> {
        &self.chain
    }

    /// TTL recorded on snapshots.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resolve `key` through `fetch`, falling back to cached copies.
    ///
    /// # Returns
    ///
    /// - `Ok` with `stale = false` when `fetch` succeeded
    /// - `Ok` with `stale = true` and the fetch error attached when a
    ///   fallback tier answered
    /// - `Err` with exactly the error `fetch` returned when both tiers missed
    pub async fn resolve<T, E, Fetch, Fut>(
        &self,
        key: &CacheKey,
        fetch: Fetch,
    ) -> Result<Resolved<T, E>, E>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        Fetch: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match fetch().await {
            Ok(data) => {
                self.persist(key, &data).await;
                Ok(Resolved::fresh(data))
            }
            Err(error) => {
                warn!(key = %key, error = %error, "fetch failed; walking fallback tiers");
                let fallback = self.chain.walk::<T, E>(key, Some(&error)).await;
                match fallback {
                    Some((data, tier)) => Ok(Resolved::stale(data, tier, Some(error))),
                    None => Err(error),
                }
            }
        }
    }

    /// Delete the durable snapshot for `key`. The mirror is left alone.
    pub async fn purge(&self, key: &CacheKey) -> CacheResult<()> {
        self.invalidator.purge(key).await
    }

    /// Copy a fresh payload into both tiers. Never fails.
    async fn persist<T: Serialize>(&self, key: &CacheKey, data: &T) {
        let stored = best_effort("snapshot_upsert", key, self.write_snapshot(key, data)).await;
        let mirrored = best_effort("mirror_write", key, self.chain.mirror().write(key, data)).await;
        debug!(key = %key, stored, mirrored, "fresh payload persisted");
    }

    async fn write_snapshot<T: Serialize>(
        &self,
        key: &CacheKey,
        data: &T,
    ) -> Result<(), PersistenceError> {
        let payload = serde_json::to_value(data).map_err(|e| PersistenceError::Checksum {
            reason: e.to_string(),
        })?;
        let sum = checksum(&payload);
        let snapshot = Snapshot::module(key.clone(), payload, sum, Utc::now(), self.ttl);
        self.chain.store().upsert(snapshot).await?;
        Ok(())
    }
}

impl<S: SnapshotStore, F: FileSystem> Clone for ModuleResolver<S, F> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            invalidator: self.invalidator.clone(),
            ttl: self.ttl,
        }
    }
}
