//! Application context for CLI command execution.
//!
//! This module provides the `App` struct that wires a working directory to
//! a [`GraphEngine`]: it finds the repository root, loads its configuration,
//! opens the snapshot store and registers the repository's git backend.
//!
//! # Example
//!
//! ```ignore
//! let app = App::from_directory(Path::new(".")).await?;
//! let graph = app.engine().get_graph(app.repo(), false).await?;
//! ```

use crate::config::EngineConfig;
use crate::domain::RepoId;
use crate::error::Result;
use crate::vcs::GitCli;
use crate::GraphEngine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use trellis_store::FileStore;

/// Application context for CLI operations.
#[derive(Debug)]
pub struct App {
    /// Top-level directory of the work tree
    root: PathBuf,

    /// Cache identity of the repository
    repo: RepoId,

    /// Engine with the repository registered
    engine: GraphEngine,
}

impl App {
    /// Create an App instance for the repository containing `working_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `working_dir` is not inside a git work tree
    /// - The configuration file exists but cannot be loaded
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root = GitCli::discover(working_dir).await?;
        let root = tokio::fs::canonicalize(&root).await?;
        let repo = RepoId::from_path(&root);

        let config = EngineConfig::load_or_default(&root).await?;
        let store = FileStore::new(config.store_path(&root));
        debug!(root = %root.display(), repo = %repo, store = %store.root().display(), "Opened repository");

        let engine = GraphEngine::new(config, Arc::new(store));
        engine
            .register(repo.clone(), Arc::new(GitCli::new(&root)))
            .await;

        Ok(Self { root, repo, engine })
    }

    /// Top-level directory of the work tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache identity of the repository.
    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    /// The graph engine serving this repository.
    pub fn engine(&self) -> &GraphEngine {
        &self.engine
    }
}
