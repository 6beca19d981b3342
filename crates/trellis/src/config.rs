//! Engine configuration.
//!
//! Settings live in `.trellis/config.yaml` at the repository root. Every key
//! is optional; missing keys take their defaults.
//!
//! ```yaml
//! max-nodes: 800
//! memory-ttl-secs: 30
//! snapshot-retention: 20
//! incremental-candidates: 10
//! incremental-fill-ratio: 0.9
//! store-dir: .trellis/cache
//! ```

use crate::error::{Error, Result};
use crate::graph::builder::DEFAULT_MAX_NODES;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Name of the trellis directory at the repository root
pub const TRELLIS_DIR_NAME: &str = ".trellis";

/// Name of the configuration file inside the trellis directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default memory tier TTL in seconds
pub const DEFAULT_MEMORY_TTL_SECS: u64 = 30;

/// Default number of snapshots kept per repository
pub const DEFAULT_SNAPSHOT_RETENTION: usize = 20;

/// Default number of cached heads tried by the incremental updater
pub const DEFAULT_INCREMENTAL_CANDIDATES: usize = 10;

/// Default fill ratio above which a cached graph is not extended
pub const DEFAULT_INCREMENTAL_FILL_RATIO: f64 = 0.9;

/// Default snapshot directory, relative to the repository root
pub const DEFAULT_STORE_DIR: &str = ".trellis/cache";

/// Tunables of the graph engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    /// Hard cap on the number of nodes in a graph
    pub max_nodes: usize,

    /// How long a memory-tier entry stays valid
    pub memory_ttl_secs: u64,

    /// Number of snapshots kept per repository
    pub snapshot_retention: usize,

    /// Number of cached heads the incremental updater tries
    pub incremental_candidates: usize,

    /// Cached graphs holding at least this share of `max-nodes` are not
    /// extended incrementally
    pub incremental_fill_ratio: f64,

    /// Number of log records requested by a full rebuild.
    ///
    /// Defaults to one more than `max-nodes`, so a history longer than the
    /// cap is detected and flagged as truncated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,

    /// Directory of the persistent tier, relative to the repository root
    pub store_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            memory_ttl_secs: DEFAULT_MEMORY_TTL_SECS,
            snapshot_retention: DEFAULT_SNAPSHOT_RETENTION,
            incremental_candidates: DEFAULT_INCREMENTAL_CANDIDATES,
            incremental_fill_ratio: DEFAULT_INCREMENTAL_FILL_RATIO,
            history_limit: None,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}

impl EngineConfig {
    /// Path of the configuration file for the repository at `repo_root`.
    #[must_use]
    pub fn path_for(repo_root: &Path) -> PathBuf {
        repo_root.join(TRELLIS_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Load and validate configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails [`validate`](Self::validate).
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the repository's configuration, or the defaults if it has none.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file exists but cannot be loaded.
    pub async fn load_or_default(repo_root: &Path) -> Result<Self> {
        let path = Self::path_for(repo_root);
        if fs::try_exists(&path).await? {
            debug!(path = %path.display(), "Loading configuration");
            Self::load(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self.max_nodes == 0 {
            return Err(Error::Config("max-nodes must be at least 1".to_string()));
        }
        if self.snapshot_retention == 0 {
            return Err(Error::Config(
                "snapshot-retention must be at least 1".to_string(),
            ));
        }
        if self.incremental_candidates == 0 {
            return Err(Error::Config(
                "incremental-candidates must be at least 1".to_string(),
            ));
        }
        if !(self.incremental_fill_ratio > 0.0 && self.incremental_fill_ratio <= 1.0) {
            return Err(Error::Config(format!(
                "incremental-fill-ratio must be in (0, 1], got {}",
                self.incremental_fill_ratio
            )));
        }
        if self.history_limit == Some(0) {
            return Err(Error::Config("history-limit must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Memory tier TTL as a duration.
    #[must_use]
    pub fn memory_ttl(&self) -> TimeDelta {
        let secs = i64::try_from(self.memory_ttl_secs).unwrap_or(i64::MAX);
        TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX)
    }

    /// Number of log records a full rebuild asks for.
    #[must_use]
    pub fn history_limit(&self) -> usize {
        self.history_limit
            .unwrap_or_else(|| self.max_nodes.saturating_add(1))
    }

    /// Node count at which a cached graph is too full to extend.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn incremental_fill_limit(&self) -> usize {
        (self.max_nodes as f64 * self.incremental_fill_ratio).ceil() as usize
    }

    /// Absolute snapshot directory for the repository at `repo_root`.
    #[must_use]
    pub fn store_path(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.store_dir)
    }
}
