//! Content fingerprints
//!
//! A file's identity for change detection is the lowercase hex MD5 of its
//! bytes. The same string is what the mapping cache persists as `md5sum`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Hex digest of a file's content
///
/// The empty value means "no fingerprint recorded" and never equals the
/// digest of real content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Fingerprint a byte slice
    pub fn of_bytes(content: &[u8]) -> Self {
        Self(format!("{:x}", md5::compute(content)))
    }

    /// Read a file and fingerprint its content
    pub fn of_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to hash {}: {}", path.display(), e),
            ))
        })?;
        Ok(Self::of_bytes(&bytes))
    }

    /// Wrap an already computed hex digest (e.g. read back from disk)
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
