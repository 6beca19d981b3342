//! The key-value interface used by the persistent cache tier.
//!
//! The graph engine treats persistence as an external collaborator with three
//! operations over opaque byte values. Keys are plain strings; the engine
//! namespaces them itself (e.g. `graph:{repo}:{head}` and `graphIndex:{repo}`).
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync` and use interior mutability so a
//! single store can be shared behind an `Arc<dyn KvStore>` by several
//! repositories.

use crate::Result;
use async_trait::async_trait;

/// Async byte-valued key-value store.
///
/// # Error Handling
///
/// A missing key is not an error: [`get`](KvStore::get) returns `Ok(None)`
/// and [`delete`](KvStore::delete) of an absent key succeeds. Errors are
/// reserved for backend failures (I/O, invalid keys).
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}
