//! Graph construction from parsed commit records.

use crate::domain::{BranchSummary, CommitGraph, CommitHash, CommitNode};
use std::collections::BTreeMap;
use tracing::info;

/// Default hard cap on the number of nodes in a graph.
pub const DEFAULT_MAX_NODES: usize = 800;

/// Builds [`CommitGraph`]s under a hard node cap.
///
/// Building is pure: the same records and summary always give the same
/// graph. Layout is a separate step (see [`layout`](super::layout)).
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder {
    max_nodes: usize,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NODES)
    }
}

impl GraphBuilder {
    /// Create a builder keeping at most `max_nodes` commits.
    #[must_use]
    pub fn new(max_nodes: usize) -> Self {
        Self { max_nodes }
    }

    /// The node cap.
    #[must_use]
    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Build a graph from `commits` and the current branch state.
    ///
    /// When there are more commits than the cap, the most recent ones by
    /// timestamp are kept (ties broken by hash) and the graph is flagged
    /// `truncated`. Branch labels on nodes are re-derived from `summary`;
    /// any labels already on the records are discarded. Tips pointing at
    /// commits outside the result make the graph partial, not invalid.
    #[must_use]
    pub fn build(
        &self,
        commits: BTreeMap<CommitHash, CommitNode>,
        summary: &BranchSummary,
    ) -> CommitGraph {
        let total_commits = commits.len();
        let truncated = total_commits > self.max_nodes;

        let mut nodes = if truncated {
            info!(
                total = total_commits,
                kept = self.max_nodes,
                "Commit count exceeds node cap, truncating to most recent commits"
            );
            keep_most_recent(commits, self.max_nodes)
        } else {
            commits
        };

        for node in nodes.values_mut() {
            node.branches.clear();
            node.level = 0;
            node.lane = 0;
        }
        for (name, hash) in &summary.branches {
            if let Some(node) = nodes.get_mut(hash) {
                node.branches.insert(name.clone());
            }
        }

        CommitGraph {
            nodes,
            branch_tips: summary.branches.clone(),
            head_hash: summary.head.clone(),
            current_branch: summary.current.clone(),
            truncated,
            total_commits,
        }
    }
}

fn keep_most_recent(
    commits: BTreeMap<CommitHash, CommitNode>,
    limit: usize,
) -> BTreeMap<CommitHash, CommitNode> {
    let mut ordered: Vec<CommitNode> = commits.into_values().collect();
    ordered.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.hash.cmp(&b.hash))
    });
    ordered.truncate(limit);
    ordered
        .into_iter()
        .map(|node| (node.hash.clone(), node))
        .collect()
}
