//! Best-effort persistence.
//!
//! Writes that follow a successful fetch must never fail the read or change
//! its result. Only failures convertible into [`PersistenceError`] can be
//! passed in, which keeps the absorbed set closed: key validation happened
//! long before, and panics are not caught.

use std::future::Future;

use keepsake_core::{CacheKey, PersistenceError};
use tracing::warn;

/// Run a persistence operation, logging and discarding its failure.
///
/// Returns whether the operation succeeded.
pub async fn best_effort<Fut, E>(operation: &'static str, key: &CacheKey, op: Fut) -> bool
where
    Fut: Future<Output = Result<(), E>>,
    E: Into<PersistenceError>,
{
    match op.await {
        Ok(()) => true,
        Err(e) => {
            let error: PersistenceError = e.into();
            warn!(operation, key = %key, error = %error, "best-effort write failed; continuing");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake_core::{MirrorError, StoreError};

    fn key() -> CacheKey {
        CacheKey::new("EDUCATION").unwrap()
    }

    #[tokio::test]
    async fn test_success_reports_true() {
        let ok = best_effort("noop", &key(), async { Ok::<(), PersistenceError>(()) }).await;
        assert!(ok);
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let ok = best_effort("snapshot_upsert", &key(), async {
            Err::<(), _>(StoreError::Backend {
                reason: "connection reset".to_string(),
            })
        })
        .await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_mirror_failure_is_swallowed() {
        let ok = best_effort("mirror_write", &key(), async {
            Err::<(), _>(MirrorError::Io {
                path: "/mirror/modules/EDUCATION.json".to_string(),
                reason: "read-only filesystem".to_string(),
            })
        })
        .await;
        assert!(!ok);
    }

    #[tokio::test]
    #[should_panic(expected = "bug in writer")]
    async fn test_panics_are_not_absorbed() {
        best_effort("mirror_write", &key(), async {
            if true {
                panic!("bug in writer");
            }
            Ok::<(), PersistenceError>(())
        })
        .await;
    }
}
