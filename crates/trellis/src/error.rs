//! Error types for trellis operations.
//!
//! The graph engine itself degrades instead of failing (see
//! [`GraphEngine::get_graph`](crate::GraphEngine::get_graph)); these errors
//! surface from the lower layers it is built on and from configuration and
//! CLI plumbing.

use crate::domain::RepoId;
use std::io;
use thiserror::Error;

/// The error type for trellis operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Persistent key-value store error.
    #[error("Store error: {0}")]
    Store(#[from] trellis_store::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The version-control tool failed or returned unusable output.
    #[error("{command} failed: {message}")]
    Vcs {
        /// The command that was run (e.g. `git log`).
        command: String,
        /// Error output or a description of the failure.
        message: String,
    },

    /// No version-control backend is registered for the repository.
    #[error("Repository not registered: {0}")]
    UnknownRepository(RepoId),

    /// A persisted snapshot could not be used.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// A specialized Result type for trellis operations.
pub type Result<T> = std::result::Result<T, Error>;
