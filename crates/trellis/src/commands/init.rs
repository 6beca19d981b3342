//! Implementation of the `init` command.
//!
//! Creates the `.trellis/` directory at a repository root with a default
//! configuration file and a `.gitignore` that keeps the snapshot cache out
//! of version control.

use crate::config::{EngineConfig, TRELLIS_DIR_NAME};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the gitignore file within .trellis
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created trellis directory
    pub trellis_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created gitignore file
    pub gitignore_file: PathBuf,
}

/// Write the default configuration for the repository at `repo_root`.
///
/// # Errors
///
/// Returns an error if:
/// - A configuration file already exists
/// - File system operations fail
pub async fn init(repo_root: &Path) -> Result<InitResult> {
    let trellis_dir = repo_root.join(TRELLIS_DIR_NAME);
    let config_file = EngineConfig::path_for(repo_root);

    if fs::try_exists(&config_file).await? {
        return Err(Error::Config(format!(
            "Trellis is already initialized here. Found existing '{}'",
            config_file.display()
        )));
    }

    fs::create_dir_all(&trellis_dir).await?;

    let config = EngineConfig::default();
    config.save(&config_file).await?;

    let gitignore_file = trellis_dir.join(GITIGNORE_FILE_NAME);
    let gitignore_content = "\
# Graph snapshots are rebuilt on demand
cache/
";
    fs::write(&gitignore_file, gitignore_content).await?;

    Ok(InitResult {
        trellis_dir,
        config_file,
        gitignore_file,
    })
}

/// Check if a repository has a trellis configuration.
pub fn is_initialized(repo_root: &Path) -> bool {
    EngineConfig::path_for(repo_root).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_directory_structure() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path()).await.unwrap();

        assert!(result.trellis_dir.exists());
        assert!(result.config_file.exists());
        assert!(result.gitignore_file.exists());
        assert!(is_initialized(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_init_writes_loadable_defaults() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path()).await.unwrap();

        let config = EngineConfig::load(&result.config_file).await.unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[tokio::test]
    async fn test_init_fails_if_already_initialized() {
        let temp_dir = TempDir::new().unwrap();

        init(temp_dir.path()).await.unwrap();
        let result = init(temp_dir.path()).await;

        let err_msg = result.unwrap_err().to_string().to_lowercase();
        assert!(err_msg.contains("already initialized"));
    }

    #[tokio::test]
    async fn test_init_ignores_cache_dir() {
        let temp_dir = TempDir::new().unwrap();

        let result = init(temp_dir.path()).await.unwrap();

        let content = tokio::fs::read_to_string(&result.gitignore_file)
            .await
            .unwrap();
        assert!(content.lines().any(|line| line == "cache/"));
    }

    #[test]
    fn test_is_initialized_false() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!is_initialized(temp_dir.path()));
    }
}
