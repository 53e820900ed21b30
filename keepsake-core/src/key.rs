//! Cache keys and the key-to-filename mapping.
//!
//! A `CacheKey` can only be built through [`CacheKey::new`], which validates
//! the raw identifier and precomputes its sanitized filename. Code that holds
//! a `CacheKey` never has to deal with a key that cannot be mirrored to disk.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::KeyError;

/// Longest raw key accepted, in bytes.
pub const MAX_KEY_LEN: usize = 256;

/// Escape marker for every byte outside `[A-Za-z0-9-]`.
const ESCAPE: char = '_';

/// Longest stem written verbatim. `.json` plus this stays well under the
/// 255-byte filename limit of common filesystems.
const MAX_STEM_LEN: usize = 200;

/// Bytes of the escaped stem kept in front of the digest for long keys.
const DIGEST_PREFIX_LEN: usize = 128;

/// Identity under which a result is cached.
///
/// Either a fixed content-module identifier (`"EDUCATION"`) or an arbitrary
/// document slug (`"about/team"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CacheKey {
    inner: KeyInner,
}

/// Private inner struct - prevents external construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct KeyInner {
    raw: String,
    file_stem: String,
}

impl CacheKey {
    /// Validate a raw identifier and build a key from it.
    ///
    /// # Errors
    ///
    /// - [`KeyError::Empty`] if the key is empty or only whitespace
    /// - [`KeyError::TooLong`] if it exceeds [`MAX_KEY_LEN`] bytes
    /// - [`KeyError::ControlCharacter`] if it contains a control character
    pub fn new(raw: impl Into<String>) -> Result<Self, KeyError> {
        let raw = raw.into();

        if raw.trim().is_empty() {
            return Err(KeyError::Empty);
        }
        if raw.len() > MAX_KEY_LEN {
            return Err(KeyError::TooLong {
                len: raw.len(),
                max: MAX_KEY_LEN,
            });
        }
        if let Some((position, _)) = raw.char_indices().find(|(_, c)| c.is_control()) {
            return Err(KeyError::ControlCharacter { position });
        }

        let file_stem = sanitize_key(&raw)?;
        Ok(Self {
            inner: KeyInner { raw, file_stem },
        })
    }

    /// The key exactly as the caller supplied it.
    pub fn as_str(&self) -> &str {
        &self.inner.raw
    }

    /// Filesystem-safe stem derived from the key.
    pub fn file_stem(&self) -> &str {
        &self.inner.file_stem
    }

    /// Bytes used as the durable store's row key.
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.raw.as_bytes()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.raw)
    }
}

impl TryFrom<String> for CacheKey {
    type Error = KeyError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl TryFrom<&str> for CacheKey {
    type Error = KeyError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.inner.raw
    }
}

/// Map an untrusted key to a single safe path component.
///
/// ASCII letters, digits and `-` are kept. Every other byte, `_` included,
/// becomes `_XX` with `XX` its uppercase hex value, so separators and dots
/// never reach the filesystem and distinct keys never share a stem.
///
/// A stem longer than 200 bytes is cut to its first 128 bytes followed by
/// `_h` and the SHA-256 of the raw key. Escapes only ever put hex digits after
/// `_`, so the `_h` marker cannot appear in a verbatim stem.
///
/// # Errors
///
/// [`KeyError::Empty`] for an empty input.
pub fn sanitize_key(raw: &str) -> Result<String, KeyError> {
    if raw.is_empty() {
        return Err(KeyError::Empty);
    }

    let mut stem = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push(ESCAPE);
            stem.push_str(&hex::encode_upper([byte]));
        }
    }

    if stem.len() > MAX_STEM_LEN {
        let digest = hex::encode(Sha256::digest(raw.as_bytes()));
        stem.truncate(DIGEST_PREFIX_LEN);
        stem.push(ESCAPE);
        stem.push('h');
        stem.push_str(&digest);
    }

    Ok(stem)
}
