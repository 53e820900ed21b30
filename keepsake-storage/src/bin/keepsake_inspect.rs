/// Snapshot inspector - shows what each fallback tier holds for a key.
///
/// Usage: cargo run --bin keepsake_inspect <modules|documents> [key]
///
/// Store and mirror locations come from the `KEEPSAKE_*` environment.

use std::sync::Arc;

use chrono::Utc;
use keepsake_core::{CacheKey, CacheSettings};
use keepsake_storage::{
    FileMirror, LmdbSnapshotStore, LocalFileSystem, SnapshotStore, DOCUMENTS_CATEGORY,
    MODULES_CATEGORY,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keepsake=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let category = match args.get(1).map(String::as_str) {
        Some(MODULES_CATEGORY) => MODULES_CATEGORY,
        Some(DOCUMENTS_CATEGORY) => DOCUMENTS_CATEGORY,
        _ => {
            eprintln!("Usage: cargo run --bin keepsake_inspect <modules|documents> [key]");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  KEEPSAKE_STORE_DIR=.cache/keepsake/lmdb cargo run --bin keepsake_inspect modules EDUCATION");
            std::process::exit(1);
        }
    };

    let settings = CacheSettings::from_env();
    if let Err(e) = settings.validate() {
        eprintln!("Invalid settings: {}", e);
        std::process::exit(1);
    }

    let store_path = settings.store_path(category);
    let store = match LmdbSnapshotStore::open(&store_path, settings.store_max_size_mb) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open {}: {}", store_path.display(), e);
            std::process::exit(1);
        }
    };

    match args.get(2) {
        None => list_keys(&store).await,
        Some(raw) => {
            let key = match CacheKey::new(raw.as_str()) {
                Ok(key) => key,
                Err(e) => {
                    eprintln!("Invalid key {:?}: {}", raw, e);
                    std::process::exit(1);
                }
            };
            show_key(&store, &settings, category, &key).await;
        }
    }
}

async fn list_keys(store: &LmdbSnapshotStore) {
    match store.keys().await {
        Ok(keys) if keys.is_empty() => println!("(no snapshots)"),
        Ok(keys) => {
            for key in keys {
                println!("{}", key);
            }
        }
        Err(e) => {
            eprintln!("Failed to list snapshots: {}", e);
            std::process::exit(1);
        }
    }
}

async fn show_key(
    store: &LmdbSnapshotStore,
    settings: &CacheSettings,
    category: &str,
    key: &CacheKey,
) {
    let now = Utc::now();

    println!("key:        {}", key);
    match store.get(key).await {
        Ok(Some(snapshot)) => {
            println!("snapshot:   present");
            println!("  checksum:   {}", snapshot.checksum.as_deref().unwrap_or("-"));
            println!(
                "  fetched_at: {}",
                snapshot
                    .fetched_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string())
            );
            println!(
                "  expires_at: {}",
                snapshot
                    .expires_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string())
            );
            println!("  expired:    {}", snapshot.is_expired(now));
            println!("  updated_at: {}", snapshot.updated_at.to_rfc3339());
        }
        Ok(None) => println!("snapshot:   absent"),
        Err(e) => println!("snapshot:   unreadable ({})", e),
    }

    let mirror = match FileMirror::new(
        Arc::new(LocalFileSystem),
        settings.mirror_root.clone(),
        category,
    ) {
        Ok(mirror) => mirror,
        Err(e) => {
            eprintln!("Invalid mirror category: {}", e);
            std::process::exit(1);
        }
    };
    let path = mirror.path_for(key);
    match mirror.read(key).await {
        Ok(Some(_)) => println!("mirror:     present ({})", path.display()),
        Ok(None) => println!("mirror:     absent ({})", path.display()),
        Err(e) => println!("mirror:     unreadable ({})", e),
    }
}
