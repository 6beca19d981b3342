//! Persistence primitives for the trellis commit graph cache.
//!
//! This crate provides the key-value interface the graph engine persists its
//! snapshots through, two implementations of it, and the JSONL record codec
//! used to encode snapshot payloads.
//!
//! - [`KvStore`]: async `get`/`set`/`delete` over byte values
//! - [`MemoryStore`]: ephemeral store backed by a `HashMap`
//! - [`FileStore`]: one file per key, written with temp-file-then-rename
//! - [`codec`]: JSONL encoding with resilient, warning-collecting decoding

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod atomic;
pub mod codec;
pub mod error;
pub mod file;
pub mod kv;
pub mod memory;
pub mod warning;

pub use atomic::write_atomic;
pub use codec::{decode_jsonl_resilient, encode_jsonl};
pub use error::{Error, Result};
pub use file::FileStore;
pub use kv::KvStore;
pub use memory::MemoryStore;
pub use warning::{Damage, Warning};
