//! Keepsake Test Utilities
//!
//! Centralized test infrastructure for the keepsake workspace:
//! - Proptest generators for keys and payloads
//! - A fixture wiring both resolvers to in-memory tiers
//! - Fetch helpers that succeed, fail, or count their calls
//! - Content fixtures shaped like real module rows

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use keepsake_storage::{
    DocumentResolver, InMemoryFileSystem, InMemorySnapshotStore, ModuleResolver,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// Re-export core types for convenience
pub use keepsake_core::{
    checksum, CacheError, CacheKey, CacheSettings, Resolved, Snapshot, StoreError, Tier,
};

// ============================================================================
// FETCH HELPERS
// ============================================================================

/// Error produced by test fetches. Compared by identity in assertions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upstream unavailable: {0}")]
pub struct UpstreamError(pub String);

impl UpstreamError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Counts how many times a fetch was invoked.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call.
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// CONTENT FIXTURES
// ============================================================================

/// A row of a list-style content module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRow {
    pub id: u32,
    pub title: String,
    pub sort_order: i32,
}

impl ModuleRow {
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            sort_order: id as i32,
        }
    }
}

/// Rows for the education module.
pub fn education_rows() -> Vec<ModuleRow> {
    vec![ModuleRow::new(1, "B.Tech, Computer Science")]
}

/// A page document with nested blocks.
pub fn page_document(title: &str) -> Value {
    json!({
        "title": title,
        "blocks": [
            {"type": "heading", "text": title},
            {"type": "paragraph", "text": "Lorem ipsum"}
        ]
    })
}

/// Build a key, panicking on invalid input.
pub fn key(raw: &str) -> CacheKey {
    CacheKey::new(raw).expect("test key should be valid")
}

// ============================================================================
// TIERED FIXTURE
// ============================================================================

/// Both resolvers wired to in-memory tiers.
///
/// Module and document snapshots use separate stores, like separate LMDB
/// environments in production. Both mirrors share one filesystem under
/// `/mirror`.
pub struct TieredFixture {
    pub modules: ModuleResolver<InMemorySnapshotStore, InMemoryFileSystem>,
    pub documents: DocumentResolver<InMemorySnapshotStore, InMemoryFileSystem>,
    pub module_store: Arc<InMemorySnapshotStore>,
    pub document_store: Arc<InMemorySnapshotStore>,
    pub fs: Arc<InMemoryFileSystem>,
    pub settings: CacheSettings,
}

impl TieredFixture {
    pub fn new() -> Self {
        Self::with_settings(CacheSettings::new().with_mirror_root("/mirror"))
    }

    pub fn with_settings(settings: CacheSettings) -> Self {
        let module_store = Arc::new(InMemorySnapshotStore::new());
        let document_store = Arc::new(InMemorySnapshotStore::new());
        let fs = Arc::new(InMemoryFileSystem::new());

        let modules = ModuleResolver::new(Arc::clone(&module_store), Arc::clone(&fs), &settings)
            .expect("modules category is valid");
        let documents =
            DocumentResolver::new(Arc::clone(&document_store), Arc::clone(&fs), &settings)
                .expect("documents category is valid");

        Self {
            modules,
            documents,
            module_store,
            document_store,
            fs,
            settings,
        }
    }

    /// Plant raw bytes as the module mirror file for `key`.
    pub fn plant_module_mirror(&self, key: &CacheKey, contents: &str) {
        let path = self.modules.chain().mirror().path_for(key);
        self.fs.put_raw(path, contents);
    }
}

impl Default for TieredFixture {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    /// Fixed module identifiers like `EDUCATION`.
    pub fn arb_module_key() -> impl Strategy<Value = CacheKey> {
        "[A-Z][A-Z_]{0,15}".prop_map(|raw| CacheKey::new(raw).expect("module key is valid"))
    }

    /// Slugs with separators, like `about/team-2024`.
    pub fn arb_slug() -> impl Strategy<Value = CacheKey> {
        "[a-z0-9]{1,8}(/[a-z0-9-]{1,8}){0,3}"
            .prop_map(|raw| CacheKey::new(raw).expect("slug is valid"))
    }

    pub fn arb_module_row() -> impl Strategy<Value = ModuleRow> {
        (any::<u32>(), "[a-zA-Z ,.]{1,32}", any::<i32>()).prop_map(|(id, title, sort_order)| {
            ModuleRow {
                id,
                title,
                sort_order,
            }
        })
    }

    pub fn arb_module_rows() -> impl Strategy<Value = Vec<ModuleRow>> {
        proptest::collection::vec(arb_module_row(), 0..6)
    }

    /// Arbitrary JSON values, a few levels deep.
    pub fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z ]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }
}
