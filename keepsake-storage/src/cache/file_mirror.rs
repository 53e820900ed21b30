//! Local-disk fallback copy of the last fetched payload.
//!
//! One pretty-printed JSON file per key per category:
//! `<root>/<category>/<sanitized key>.json`. No checksum, no timestamps; the
//! file holds the payload exactly as it was serialized.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use keepsake_core::{sanitize_key, CacheKey, KeyError, MirrorError};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::traits::FileSystem;

/// Mirror category for module payloads.
pub const MODULES_CATEGORY: &str = "modules";

/// Mirror category for slug-addressed documents.
pub const DOCUMENTS_CATEGORY: &str = "documents";

/// Extension of every mirror file.
const EXTENSION: &str = "json";

/// [`FileSystem`] backed by the process filesystem via tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await
    }
}

/// A category directory of mirror files.
pub struct FileMirror<F: FileSystem> {
    fs: Arc<F>,
    root: PathBuf,
    category: String,
}

impl<F: FileSystem> FileMirror<F> {
    /// Create a mirror rooted at `root` for one category.
    ///
    /// The category goes through the same sanitizer as keys and becomes a
    /// single directory name.
    pub fn new(
        fs: Arc<F>,
        root: impl Into<PathBuf>,
        category: &str,
    ) -> Result<Self, KeyError> {
        Ok(Self {
            fs,
            root: root.into(),
            category: sanitize_key(category)?,
        })
    }

    /// Category directory name.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Path of the mirror file for a key.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(&self.category)
            .join(format!("{}.{}", key.file_stem(), EXTENSION))
    }

    /// Read the mirrored payload for a key.
    ///
    /// A missing file is `Ok(None)`. Any other I/O failure and any parse
    /// failure, torn writes included, is an error for the caller to treat as a
    /// miss.
    pub async fn read(&self, key: &CacheKey) -> Result<Option<Value>, MirrorError> {
        let path = self.path_for(key);

        let bytes = match self.fs.read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(key = %key, category = %self.category, "mirror miss");
                return Ok(None);
            }
            Err(e) => {
                return Err(MirrorError::Io {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        let value = serde_json::from_slice(&bytes).map_err(|e| MirrorError::Decode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(value))
    }

    /// Overwrite the mirror file for a key with `value` as pretty JSON.
    pub async fn write<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
    ) -> Result<(), MirrorError> {
        let path = self.path_for(key);

        let bytes = serde_json::to_vec_pretty(value).map_err(|e| MirrorError::Encode {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.fs
            .write(&path, &bytes)
            .await
            .map_err(|e| MirrorError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        debug!(key = %key, category = %self.category, size = bytes.len(), "mirror written");
        Ok(())
    }
}

impl<F: FileSystem> Clone for FileMirror<F> {
    fn clone(&self) -> Self {
        Self {
            fs: Arc::clone(&self.fs),
            root: self.root.clone(),
            category: self.category.clone(),
        }
    }
}
