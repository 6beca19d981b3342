//! In-memory [`VcsBackend`].
//!
//! Holds a commit set and a branch table and answers the three queries the
//! engine makes the way `git` would, rendering log text in the record layout
//! of [`LOG_FORMAT`]. Every query can be made to fail, and log queries are
//! counted, so engine behaviour can be checked without a real repository.
//!
//! The setup methods take `&self`, so a history can keep evolving after the
//! backend has been shared with an engine.

use super::{RevisionRange, VcsBackend};
use crate::domain::{BranchSummary, CommitHash};
use crate::error::{Error, Result};
use crate::parser::{FIELD_SEPARATOR, LOCAL_BRANCH_PREFIX, LOG_FORMAT};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct StoredCommit {
    parents: Vec<CommitHash>,
    timestamp: i64,
}

#[derive(Debug, Default)]
struct Inner {
    commits: BTreeMap<CommitHash, StoredCommit>,
    branches: BTreeMap<String, CommitHash>,
    current: Option<String>,
    detached: Option<CommitHash>,
    fail_log: bool,
    fail_ancestry: bool,
    fail_branches: bool,
    log_queries: usize,
    ancestry_queries: usize,
}

impl Inner {
    fn head(&self) -> Option<CommitHash> {
        match &self.current {
            Some(name) => self.branches.get(name).cloned(),
            None => self.detached.clone(),
        }
    }

    /// Commits reachable from `starts`, including the starts themselves.
    fn reachable<'a>(&self, starts: impl IntoIterator<Item = &'a CommitHash>) -> HashSet<CommitHash> {
        let mut seen = HashSet::new();
        let mut stack: Vec<CommitHash> = starts.into_iter().cloned().collect();
        while let Some(hash) = stack.pop() {
            let Some(commit) = self.commits.get(&hash) else {
                continue;
            };
            if seen.insert(hash) {
                stack.extend(commit.parents.iter().cloned());
            }
        }
        seen
    }

    fn require(&self, hash: &CommitHash, command: &str) -> Result<()> {
        if self.commits.contains_key(hash) {
            Ok(())
        } else {
            Err(Error::Vcs {
                command: command.to_string(),
                message: format!("unknown revision {hash}"),
            })
        }
    }

    fn decorations(&self, hash: &CommitHash) -> String {
        let mut decorations = Vec::new();
        if self.current.is_none() && self.detached.as_ref() == Some(hash) {
            decorations.push("HEAD".to_string());
        }
        for (name, tip) in &self.branches {
            if tip != hash {
                continue;
            }
            if self.current.as_deref() == Some(name.as_str()) {
                decorations.insert(0, format!("HEAD -> {LOCAL_BRANCH_PREFIX}{name}"));
            } else {
                decorations.push(format!("{LOCAL_BRANCH_PREFIX}{name}"));
            }
        }
        decorations.join(", ")
    }

    /// Render `hashes` newest first, at most `limit` records.
    fn render(&self, hashes: &HashSet<CommitHash>, limit: usize) -> String {
        let mut ordered: Vec<(&CommitHash, &StoredCommit)> = self
            .commits
            .iter()
            .filter(|(hash, _)| hashes.contains(*hash))
            .collect();
        ordered.sort_by(|(ha, a), (hb, b)| b.timestamp.cmp(&a.timestamp).then_with(|| ha.cmp(hb)));

        let mut out = String::new();
        for (hash, commit) in ordered.into_iter().take(limit) {
            let parents: Vec<&str> = commit.parents.iter().map(CommitHash::as_str).collect();
            out.push_str(hash.as_str());
            out.push(FIELD_SEPARATOR);
            out.push_str(&parents.join(" "));
            out.push(FIELD_SEPARATOR);
            out.push_str(&self.decorations(hash));
            out.push(FIELD_SEPARATOR);
            out.push_str(&commit.timestamp.to_string());
            out.push('\n');
        }
        out
    }
}

/// Scriptable in-memory repository history.
#[derive(Debug, Default)]
pub struct MemoryVcs {
    inner: Mutex<Inner>,
}

impl MemoryVcs {
    /// Create an empty repository (no commits, unborn HEAD).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add (or replace) a commit.
    pub fn commit(&self, hash: &str, parents: &[&str], timestamp: i64) {
        let parents = parents.iter().map(|p| CommitHash::from(*p)).collect();
        self.lock()
            .commits
            .insert(CommitHash::from(hash), StoredCommit { parents, timestamp });
    }

    /// Commit on top of `branch` and move the branch to the new commit.
    ///
    /// An unknown branch is created with the commit as a root.
    pub fn advance(&self, branch: &str, hash: &str, timestamp: i64) {
        let mut inner = self.lock();
        let parents = inner.branches.get(branch).cloned().into_iter().collect();
        inner
            .commits
            .insert(CommitHash::from(hash), StoredCommit { parents, timestamp });
        inner
            .branches
            .insert(branch.to_string(), CommitHash::from(hash));
    }

    /// Point `name` at `hash`, creating the branch if needed.
    pub fn set_branch(&self, name: &str, hash: &str) {
        self.lock()
            .branches
            .insert(name.to_string(), CommitHash::from(hash));
    }

    /// Remove a branch.
    pub fn delete_branch(&self, name: &str) {
        let mut inner = self.lock();
        inner.branches.remove(name);
        if inner.current.as_deref() == Some(name) {
            inner.current = None;
        }
    }

    /// Make `name` the checked-out branch.
    pub fn checkout(&self, name: &str) {
        let mut inner = self.lock();
        inner.current = Some(name.to_string());
        inner.detached = None;
    }

    /// Detach HEAD at `hash`.
    pub fn detach(&self, hash: &str) {
        let mut inner = self.lock();
        inner.current = None;
        inner.detached = Some(CommitHash::from(hash));
    }

    /// Make every log query fail.
    pub fn fail_log(&self, fail: bool) {
        self.lock().fail_log = fail;
    }

    /// Make every ancestry query fail.
    pub fn fail_ancestry(&self, fail: bool) {
        self.lock().fail_ancestry = fail;
    }

    /// Make every branch listing fail.
    pub fn fail_branches(&self, fail: bool) {
        self.lock().fail_branches = fail;
    }

    /// Number of log queries answered or refused so far.
    #[must_use]
    pub fn log_query_count(&self) -> usize {
        self.lock().log_queries
    }

    /// Number of ancestry queries answered or refused so far.
    #[must_use]
    pub fn ancestry_query_count(&self) -> usize {
        self.lock().ancestry_queries
    }

    /// The commit HEAD currently resolves to.
    #[must_use]
    pub fn head(&self) -> Option<CommitHash> {
        self.lock().head()
    }
}

#[async_trait]
impl VcsBackend for MemoryVcs {
    async fn query_log(&self, range: &RevisionRange, format: &str) -> Result<String> {
        let mut inner = self.lock();
        inner.log_queries += 1;

        if inner.fail_log {
            return Err(Error::Vcs {
                command: "log".to_string(),
                message: "log query refused".to_string(),
            });
        }
        if format != LOG_FORMAT {
            return Err(Error::Vcs {
                command: "log".to_string(),
                message: format!("unsupported format '{format}'"),
            });
        }

        match range {
            RevisionRange::AllBranches { max_count } => {
                let mut starts: BTreeSet<CommitHash> = inner.branches.values().cloned().collect();
                starts.extend(inner.head());
                let reachable = inner.reachable(&starts);
                Ok(inner.render(&reachable, *max_count))
            }
            RevisionRange::Between { base, head } => {
                inner.require(base, "log")?;
                inner.require(head, "log")?;
                let excluded = inner.reachable([base]);
                let included: HashSet<CommitHash> = inner
                    .reachable([head])
                    .into_iter()
                    .filter(|hash| !excluded.contains(hash))
                    .collect();
                Ok(inner.render(&included, usize::MAX))
            }
        }
    }

    async fn is_ancestor(&self, candidate: &CommitHash, descendant: &CommitHash) -> Result<bool> {
        let mut inner = self.lock();
        inner.ancestry_queries += 1;

        if inner.fail_ancestry {
            return Err(Error::Vcs {
                command: "merge-base".to_string(),
                message: "ancestry query refused".to_string(),
            });
        }
        inner.require(candidate, "merge-base")?;
        inner.require(descendant, "merge-base")?;

        Ok(inner.reachable([descendant]).contains(candidate))
    }

    async fn list_branches(&self) -> Result<BranchSummary> {
        let inner = self.lock();
        if inner.fail_branches {
            return Err(Error::Vcs {
                command: "for-each-ref".to_string(),
                message: "branch listing refused".to_string(),
            });
        }

        Ok(BranchSummary {
            head: inner.head(),
            current: inner.current.clone(),
            branches: inner.branches.clone(),
        })
    }
}
