//! Crash-safe file replacement.
//!
//! A value is written to a hidden sibling of its target and then renamed
//! over it. A rename within one directory is atomic, so a reader sees
//! either the previous value or the new one, never a torn mix. Every write
//! uses its own temporary name, so two processes refreshing the same
//! snapshot cannot interleave their bytes.
//!
//! # Examples
//!
//! ```no_run
//! use trellis_store::write_atomic;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! write_atomic("graph%3Arepo%3Aabc", b"{\"kind\":\"header\"}\n").await?;
//! # Ok(())
//! # }
//! ```

use crate::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Distinguishes temporary files of concurrent writes within one process.
static WRITE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Replace the contents of `path` with `bytes` in one step.
///
/// The parent directory must exist.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written or the rename
/// fails. The previous contents of `path`, if any, are then untouched and
/// the temporary file is removed.
pub async fn write_atomic<P>(path: P, bytes: &[u8]) -> Result<()>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let temp_path = temp_sibling(path, WRITE_SEQUENCE.fetch_add(1, Ordering::Relaxed));

    let written = match write_synced(&temp_path, bytes).await {
        Ok(()) => tokio::fs::rename(&temp_path, path).await.map_err(Into::into),
        Err(e) => Err(e),
    };
    if written.is_err() {
        let _ = tokio::fs::remove_file(&temp_path).await;
    }
    written
}

/// `dir/.name.<pid>.<sequence>.tmp` for a target `dir/name`.
fn temp_sibling(path: &Path, sequence: u64) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(format!(".{}.{sequence}.tmp", std::process::id()));
    path.with_file_name(name)
}

async fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}
