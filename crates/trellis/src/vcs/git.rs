//! [`VcsBackend`] backed by the `git` command line.
//!
//! Every call runs `git -C <repo> ...` through `tokio::process`, so the
//! engine's only suspending operations are these child processes.

use super::{RevisionRange, VcsBackend};
use crate::domain::{BranchSummary, CommitHash};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

const GIT: &str = "git";

/// Format used to list local branches: short name and object name.
const BRANCH_FORMAT: &str = "%(refname:short)%1f%(objectname)";

/// Runs `git` against one working tree.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    /// Use the repository at `repo_dir` (any directory inside the work tree).
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    /// Find the top-level directory of the work tree containing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Vcs`] if `path` is not inside a git work tree or git
    /// cannot be run.
    pub async fn discover(path: &Path) -> Result<PathBuf> {
        let git = Self::new(path);
        let output = git.run(&["rev-parse", "--show-toplevel"]).await?;
        let stdout = expect_success("rev-parse --show-toplevel", output)?;
        Ok(PathBuf::from(stdout.trim()))
    }

    /// The directory git is run against.
    #[must_use]
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        debug!(args = ?args, "Running git");
        Command::new(GIT)
            .arg("-C")
            .arg(&self.repo_dir)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::Vcs {
                command: format!("{GIT} {}", args.join(" ")),
                message: e.to_string(),
            })
    }

    /// Run a query whose exit status 1 means "no answer" rather than failure.
    async fn run_optional(&self, args: &[&str]) -> Result<Option<String>> {
        let output = self.run(args).await?;
        match output.status.code() {
            Some(0) => Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string())),
            Some(1) => Ok(None),
            _ => Err(Error::Vcs {
                command: format!("{GIT} {}", args.join(" ")),
                message: failure_message(&output),
            }),
        }
    }

    async fn head(&self) -> Result<Option<CommitHash>> {
        let head = self
            .run_optional(&["rev-parse", "--verify", "-q", "HEAD"])
            .await?;
        Ok(head.filter(|h| !h.is_empty()).map(CommitHash::from))
    }
}

fn expect_success(command: &str, output: Output) -> Result<String> {
    if output.status.success() {
        String::from_utf8(output.stdout).map_err(|e| Error::Vcs {
            command: format!("{GIT} {command}"),
            message: format!("non UTF-8 output: {e}"),
        })
    } else {
        Err(Error::Vcs {
            command: format!("{GIT} {command}"),
            message: failure_message(&output),
        })
    }
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.to_string()
    }
}

#[async_trait]
impl VcsBackend for GitCli {
    async fn query_log(&self, range: &RevisionRange, format: &str) -> Result<String> {
        let pretty = format!("--format={format}");
        let range_args: Vec<String> = match range {
            RevisionRange::AllBranches { max_count } => {
                let mut range_args = vec!["--branches".to_string()];
                // An unborn HEAD would make `git log` fail outright.
                if self.head().await?.is_some() {
                    range_args.push("HEAD".to_string());
                }
                range_args.push(format!("--max-count={max_count}"));
                range_args
            }
            RevisionRange::Between { base, head } => vec![format!("{base}..{head}")],
        };

        let mut args = vec!["log", "--decorate=full", pretty.as_str()];
        args.extend(range_args.iter().map(String::as_str));
        args.push("--");

        let output = self.run(&args).await?;
        expect_success("log", output)
    }

    async fn is_ancestor(&self, candidate: &CommitHash, descendant: &CommitHash) -> Result<bool> {
        let answer = self
            .run_optional(&[
                "merge-base",
                "--is-ancestor",
                candidate.as_str(),
                descendant.as_str(),
            ])
            .await?;
        Ok(answer.is_some())
    }

    async fn list_branches(&self) -> Result<BranchSummary> {
        let format = format!("--format={BRANCH_FORMAT}");
        let output = self
            .run(&["for-each-ref", "refs/heads", format.as_str()])
            .await?;
        let listing = expect_success("for-each-ref", output)?;

        let branches: BTreeMap<String, CommitHash> = listing
            .lines()
            .filter_map(|line| line.split_once('\x1f'))
            .map(|(name, hash)| (name.trim().to_string(), CommitHash::from(hash.trim())))
            .filter(|(name, hash)| !name.is_empty() && !hash.as_str().is_empty())
            .collect();

        let head = self.head().await?;
        let current = self
            .run_optional(&["symbolic-ref", "--short", "-q", "HEAD"])
            .await?
            .filter(|name| !name.is_empty());

        Ok(BranchSummary {
            head,
            current,
            branches,
        })
    }
}
