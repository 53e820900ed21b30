//! Resolver for slug-addressed documents.
//!
//! Differs from [`ModuleResolver`](super::read_through::ModuleResolver) in its
//! failure contract:
//!
//! - Snapshots hold only the raw document, no checksum or TTL.
//! - A not-found fetch result is never written to the mirror. By default it
//!   walks the fallback chain exactly like a fetch error, so a document that
//!   was removed upstream can still be served stale from an older copy.
//!   Settings can make not-found final instead.
//! - When both tiers miss the result is `None`, never an error. Callers map
//!   it to a not-found response.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use keepsake_core::{CacheKey, CacheResult, CacheSettings, Resolved, Snapshot, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::best_effort::best_effort;
use super::fallback::FallbackChain;
use super::file_mirror::{FileMirror, DOCUMENTS_CATEGORY};
use super::invalidation::SnapshotInvalidator;
use super::traits::{FileSystem, SnapshotStore};

/// Read-through resolver for documents keyed by slug.
pub struct DocumentResolver<S: SnapshotStore, F: FileSystem> {
    chain: FallbackChain<S, F>,
    invalidator: SnapshotInvalidator<S>,
    not_found_falls_back: bool,
}

impl<S: SnapshotStore, F: FileSystem> DocumentResolver<S, F> {
    /// Create a resolver mirroring into the `documents` category under
    /// `settings.mirror_root`.
    ///
    /// Fails if `settings` do not validate.
    pub fn new(store: Arc<S>, fs: Arc<F>, settings: &CacheSettings) -> CacheResult<Self> {
        settings.validate()?;
        let mirror = FileMirror::new(fs, settings.mirror_root.clone(), DOCUMENTS_CATEGORY)?;
        Ok(Self::from_parts(
            store,
            mirror,
            settings.document_not_found_falls_back,
        ))
    }

    /// Create a resolver from an existing mirror.
    pub fn from_parts(store: Arc<S>, mirror: FileMirror<F>, not_found_falls_back: bool) -> Self {
        Self {
            invalidator: SnapshotInvalidator::new(Arc::clone(&store)),
            chain: FallbackChain::new(store, mirror),
            not_found_falls_back,
        }
    }

    /// The fallback chain (store and mirror) this resolver reads from.
    pub fn chain(&self) -> &FallbackChain<S, F> {
        &self.chain
    }

    /// Resolve a document through `fetch`.
    ///
    /// `fetch` returns `Ok(None)` when the slug does not exist upstream.
    ///
    /// # Returns
    ///
    /// - `Some` fresh document when `fetch` found one
    /// - `Some` stale document from a fallback tier, with the fetch error
    ///   attached if there was one (`None` for not-found)
    /// - `None` when no tier has the document, or when not-found is final
    pub async fn resolve<T, E, Fetch, Fut>(
        &self,
        slug: &CacheKey,
        fetch: Fetch,
    ) -> Option<Resolved<T, E>>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        Fetch: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let error = match fetch().await {
            Ok(Some(document)) => {
                self.persist(slug, &document).await;
                return Some(Resolved::fresh(document));
            }
            Ok(None) if !self.not_found_falls_back => {
                debug!(key = %slug, "document not found; not consulting fallback tiers");
                return None;
            }
            Ok(None) => {
                debug!(key = %slug, "document not found; walking fallback tiers");
                None
            }
            Err(error) => {
                warn!(key = %slug, error = %error, "document fetch failed; walking fallback tiers");
                Some(error)
            }
        };

        let fallback = self.chain.walk::<T, E>(slug, error.as_ref()).await;
        fallback.map(|(document, tier)| Resolved::stale(document, tier, error))
    }

    /// Delete the durable snapshot for `slug`. The mirror is left alone.
    pub async fn purge(&self, slug: &CacheKey) -> CacheResult<()> {
        self.invalidator.purge(slug).await
    }

    async fn persist<T: Serialize>(&self, slug: &CacheKey, document: &T) {
        let stored = best_effort("document_upsert", slug, self.write_snapshot(slug, document)).await;
        let mirrored =
            best_effort("mirror_write", slug, self.chain.mirror().write(slug, document)).await;
        debug!(key = %slug, stored, mirrored, "fresh document persisted");
    }

    async fn write_snapshot<T: Serialize>(
        &self,
        slug: &CacheKey,
        document: &T,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_value(document).map_err(|e| StoreError::Encode {
            key: slug.to_string(),
            reason: e.to_string(),
        })?;
        self.chain
            .store()
            .upsert(Snapshot::document(slug.clone(), payload))
            .await
    }
}

impl<S: SnapshotStore, F: FileSystem> Clone for DocumentResolver<S, F> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            invalidator: self.invalidator.clone(),
            not_found_falls_back: self.not_found_falls_back,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::{InMemoryFileSystem, InMemorySnapshotStore};
    use keepsake_core::Tier;
    use serde_json::{json, Value};

    struct Fixture {
        resolver: DocumentResolver<InMemorySnapshotStore, InMemoryFileSystem>,
        store: Arc<InMemorySnapshotStore>,
        fs: Arc<InMemoryFileSystem>,
    }

    fn fixture(not_found_falls_back: bool) -> Fixture {
        let store = Arc::new(InMemorySnapshotStore::new());
        let fs = Arc::new(InMemoryFileSystem::new());
        let settings = CacheSettings::new()
            .with_mirror_root("/mirror")
            .with_document_not_found_falls_back(not_found_falls_back);
        let resolver =
            DocumentResolver::new(Arc::clone(&store), Arc::clone(&fs), &settings).unwrap();
        Fixture {
            resolver,
            store,
            fs,
        }
    }

    fn slug(raw: &str) -> CacheKey {
        CacheKey::new(raw).unwrap()
    }

    fn team_page() -> Value {
        json!({"title": "Team", "blocks": [{"type": "text", "body": "hello"}]})
    }

    #[tokio::test]
    async fn test_found_document_is_fresh_and_stored_raw() {
        let f = fixture(true);
        let s = slug("about/team");

        let read = f
            .resolver
            .resolve(&s, || async { Ok::<_, String>(Some(team_page())) })
            .await
            .unwrap();

        assert!(!read.stale);
        assert_eq!(read.data, team_page());

        let snap = f.store.peek(&s).unwrap();
        assert_eq!(snap.payload, team_page());
        assert!(snap.checksum.is_none());
        assert!(snap.expires_at.is_none());
        assert!(f
            .fs
            .get_raw(&f.resolver.chain().mirror().path_for(&s))
            .is_some());
    }

    #[tokio::test]
    async fn test_persistence_failures_do_not_fail_fresh_document() {
        let f = fixture(true);
        f.store.fail_writes.set(true);
        f.fs.fail_writes.set(true);

        let read = f
            .resolver
            .resolve(&slug("about/team"), || async { Ok::<_, String>(Some(team_page())) })
            .await
            .unwrap();

        assert!(!read.stale);
        assert_eq!(read.data, team_page());
        assert!(read.error.is_none());
        assert!(f.store.is_empty());
        assert_eq!(f.fs.write_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_still_mirrors_document() {
        let f = fixture(true);
        f.store.fail_writes.set(true);
        let s = slug("about/team");

        f.resolver
            .resolve(&s, || async { Ok::<_, String>(Some(team_page())) })
            .await
            .unwrap();

        assert!(f.store.is_empty());
        assert_eq!(f.fs.write_count(), 1);

        let read = f
            .resolver
            .resolve(&s, || async { Err::<Option<Value>, _>("db down".to_string()) })
            .await
            .unwrap();
        assert_eq!(read.tier, Tier::Mirror);
        assert_eq!(read.data, team_page());
    }

    #[test]
    fn test_invalid_settings_are_rejected_at_construction() {
        let settings = CacheSettings::new()
            .with_mirror_root("/mirror")
            .with_store_max_size_mb(0);
        let built = DocumentResolver::<InMemorySnapshotStore, InMemoryFileSystem>::new(
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(InMemoryFileSystem::new()),
            &settings,
        );
        assert!(matches!(built, Err(keepsake_core::CacheError::Config(_))));
    }

    #[tokio::test]
    async fn test_not_found_is_not_mirrored() {
        let f = fixture(true);

        let read = f
            .resolver
            .resolve(&slug("missing"), || async { Ok::<Option<Value>, String>(None) })
            .await;

        assert!(read.is_none());
        assert_eq!(f.fs.write_count(), 0);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_falls_back_to_snapshot() {
        let f = fixture(true);
        let s = slug("about/team");
        f.resolver
            .resolve(&s, || async { Ok::<_, String>(Some(team_page())) })
            .await;

        let read = f
            .resolver
            .resolve(&s, || async { Err::<Option<Value>, _>("db down".to_string()) })
            .await
            .unwrap();

        assert!(read.stale);
        assert_eq!(read.tier, Tier::Snapshot);
        assert_eq!(read.error.as_deref(), Some("db down"));
    }

    #[tokio::test]
    async fn test_fetch_error_with_no_tiers_is_none() {
        let f = fixture(true);
        let read = f
            .resolver
            .resolve(&slug("about"), || async {
                Err::<Option<Value>, _>("db down".to_string())
            })
            .await;
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_not_found_serves_removed_document_by_default() {
        let f = fixture(true);
        let s = slug("old-news");
        f.resolver
            .resolve(&s, || async { Ok::<_, String>(Some(team_page())) })
            .await;
        f.resolver.purge(&s).await.unwrap();

        let read = f
            .resolver
            .resolve(&s, || async { Ok::<Option<Value>, String>(None) })
            .await
            .expect("mirror copy should be served");

        assert!(read.stale);
        assert_eq!(read.tier, Tier::Mirror);
        assert!(read.error.is_none());
    }

    #[tokio::test]
    async fn test_not_found_is_final_when_configured() {
        let f = fixture(false);
        let s = slug("old-news");
        f.resolver
            .resolve(&s, || async { Ok::<_, String>(Some(team_page())) })
            .await;

        let read = f
            .resolver
            .resolve(&s, || async { Ok::<Option<Value>, String>(None) })
            .await;
        assert!(read.is_none());

        let on_error = f
            .resolver
            .resolve(&s, || async { Err::<Option<Value>, _>("db down".to_string()) })
            .await
            .unwrap();
        assert_eq!(on_error.tier, Tier::Snapshot);
    }
}
