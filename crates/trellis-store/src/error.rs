//! Error types for trellis-store operations.

use std::io;
use thiserror::Error;

/// The error type for trellis-store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred while reading or writing.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid JSONL format.
    #[error("Invalid JSONL format: {0}")]
    InvalidFormat(String),

    /// A key that cannot be stored (empty, or unusable as a file name).
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),
}

/// A specialized Result type for trellis-store operations.
pub type Result<T> = std::result::Result<T, Error>;
