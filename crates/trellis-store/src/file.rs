//! Directory-backed key-value store.
//!
//! Each key is stored in its own file inside a root directory. Writes go
//! through [`write_atomic`], so a crash mid-write never leaves a
//! partially-written value behind.
//!
//! # Key Encoding
//!
//! Keys are mapped to file names by keeping ASCII alphanumerics, `-`, `_` and
//! `.` verbatim and percent-encoding every other byte. `graph:abc:123` is
//! stored as `graph%3Aabc%3A123`. The names `.` and `..` are rejected.

use crate::atomic::write_atomic;
use crate::kv::KvStore;
use crate::{Error, Result};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Persistent [`KvStore`] keeping one file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory holding the stored values.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        Ok(self.root.join(encode_key(key)?))
    }
}

/// Encode a key as a single, portable file name.
fn encode_key(key: &str) -> Result<String> {
    if key.is_empty() || key == "." || key == ".." {
        return Err(Error::InvalidKey(key.to_string()));
    }

    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            name.push(char::from(byte));
        } else {
            let _ = write!(name, "%{byte:02X}");
        }
    }
    Ok(name)
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;
        write_atomic(&path, value).await?;
        trace!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
