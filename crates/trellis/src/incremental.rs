//! Incremental graph updates.
//!
//! When HEAD has moved forward from a commit that already has a snapshot,
//! only the commits in between need to be fetched. The updater tries the
//! most recent cached heads in order and splices the delta into the first
//! one that is an ancestor of the new HEAD.

use crate::cache::SnapshotStore;
use crate::config::EngineConfig;
use crate::domain::{BranchSummary, CommitGraph, CommitHash, RepoId};
use crate::error::Result;
use crate::graph::GraphBuilder;
use crate::parser::{parse_log, LOG_FORMAT};
use crate::vcs::{RevisionRange, VcsBackend};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Extends cached graphs with the commits added since they were built.
pub struct IncrementalUpdater<'a> {
    vcs: &'a dyn VcsBackend,
    snapshots: &'a SnapshotStore,
    builder: GraphBuilder,
    candidates: usize,
    fill_limit: usize,
}

impl<'a> IncrementalUpdater<'a> {
    /// Create an updater reading history from `vcs` and cached graphs from
    /// `snapshots`.
    pub fn new(
        vcs: &'a dyn VcsBackend,
        snapshots: &'a SnapshotStore,
        config: &EngineConfig,
    ) -> Self {
        Self {
            vcs,
            snapshots,
            builder: GraphBuilder::new(config.max_nodes),
            candidates: config.incremental_candidates,
            fill_limit: config.incremental_fill_limit(),
        }
    }

    /// Build the graph for `new_head` from a cached graph plus the delta.
    ///
    /// `index` lists cached heads, most recent first; only the first
    /// `incremental-candidates` are tried. Returns `None` when no candidate
    /// works. The result has no layout yet.
    pub async fn try_incremental(
        &self,
        repo: &RepoId,
        index: &[CommitHash],
        new_head: &CommitHash,
        summary: &BranchSummary,
    ) -> Option<CommitGraph> {
        for candidate in index.iter().take(self.candidates) {
            match self.try_candidate(repo, candidate, new_head, summary).await {
                Ok(Some(graph)) => {
                    debug!(
                        repo = %repo,
                        base = %candidate,
                        head = %new_head,
                        nodes = graph.len(),
                        "Extended cached graph"
                    );
                    return Some(graph);
                }
                Ok(None) => {}
                Err(e) => warn!(
                    repo = %repo,
                    base = %candidate,
                    error = %e,
                    "Incremental candidate failed, trying next"
                ),
            }
        }
        None
    }

    async fn try_candidate(
        &self,
        repo: &RepoId,
        candidate: &CommitHash,
        new_head: &CommitHash,
        summary: &BranchSummary,
    ) -> Result<Option<CommitGraph>> {
        let Some(cached) = self.snapshots.load(repo, candidate).await? else {
            debug!(base = %candidate, "No snapshot for candidate");
            return Ok(None);
        };

        if cached.len() >= self.fill_limit {
            debug!(
                base = %candidate,
                nodes = cached.len(),
                limit = self.fill_limit,
                "Candidate too close to the node cap"
            );
            return Ok(None);
        }

        let delta = if candidate == new_head {
            BTreeMap::new()
        } else {
            if !self.vcs.is_ancestor(candidate, new_head).await? {
                debug!(base = %candidate, head = %new_head, "Candidate is not an ancestor");
                return Ok(None);
            }
            let range = RevisionRange::Between {
                base: candidate.clone(),
                head: new_head.clone(),
            };
            let raw = self.vcs.query_log(&range, LOG_FORMAT).await?;
            let parsed = parse_log(&raw);
            for warning in &parsed.warnings {
                warn!(range = %range, "Skipped log record: {warning}");
            }
            parsed.commits
        };

        let mut merged = cached.nodes;
        merged.extend(delta);

        // A branch that moved to a commit outside both the cached graph and
        // the delta would be silently missing; leave it to a full rebuild.
        let moved_away = summary.branches.iter().find(|(name, hash)| {
            !merged.contains_key(*hash) && cached.branch_tips.get(*name) != Some(*hash)
        });
        if let Some((name, hash)) = moved_away {
            debug!(branch = %name, tip = %hash, "Branch tip outside cached graph and delta");
            return Ok(None);
        }

        Ok(Some(self.builder.build(merged, summary)))
    }
}
