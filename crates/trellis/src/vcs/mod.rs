//! The version-control capability consumed by the graph engine.
//!
//! The engine never runs the version-control tool directly. It is handed a
//! [`VcsBackend`] per repository, which keeps the engine testable against
//! [`MemoryVcs`] and leaves the shell-out details to [`GitCli`].

pub mod git;
pub mod memory;

pub use git::GitCli;
pub use memory::MemoryVcs;

use crate::domain::{BranchSummary, CommitHash};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Which commits a log query should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionRange {
    /// Commits reachable from any local branch or HEAD, newest first, at
    /// most `max_count` of them.
    AllBranches {
        /// Upper bound on the number of records
        max_count: usize,
    },

    /// Commits reachable from `head` but not from `base` (`base..head`).
    Between {
        /// Excluded end of the range
        base: CommitHash,
        /// Included end of the range
        head: CommitHash,
    },
}

impl fmt::Display for RevisionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllBranches { max_count } => write!(f, "--branches HEAD -n {max_count}"),
            Self::Between { base, head } => write!(f, "{base}..{head}"),
        }
    }
}

/// Async access to a repository's history.
///
/// Implementations must be `Send + Sync`; the engine shares them behind an
/// `Arc` and calls them from whichever task is resolving a graph.
#[async_trait]
pub trait VcsBackend: Send + Sync {
    /// Return raw log text for `range`, one record per commit, rendered with
    /// the pretty-format string `format`.
    async fn query_log(&self, range: &RevisionRange, format: &str) -> Result<String>;

    /// Returns `true` if `candidate` is an ancestor of (or equal to)
    /// `descendant`.
    async fn is_ancestor(&self, candidate: &CommitHash, descendant: &CommitHash) -> Result<bool>;

    /// The current HEAD and every local branch tip.
    async fn list_branches(&self) -> Result<BranchSummary>;
}
