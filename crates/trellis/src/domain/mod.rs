//! Domain types for the commit graph engine.
//!
//! A [`CommitGraph`] is an immutable value: every build or update produces a
//! new one, and the cache tiers hand out shared `Arc<CommitGraph>` handles.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

/// Number of hex characters kept from the path digest in a [`RepoId`].
const REPO_ID_HEX_LEN: usize = 16;

/// Length of the abbreviated hash shown to users.
const SHORT_HASH_LEN: usize = 7;

/// Identifier of a commit (its full hex object name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitHash(pub String);

impl CommitHash {
    /// Create a new commit hash
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Get the hash as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display.
    #[must_use]
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(SHORT_HASH_LEN)
            .map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CommitHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CommitHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Stable identity of a repository, used to namespace cache entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(pub String);

impl RepoId {
    /// Create a repository id from an explicit string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive a repository id from its root directory.
    ///
    /// The id is the first 16 hex characters of the SHA-256 of the path, so
    /// it is stable across runs and safe to embed in store keys. Callers
    /// should pass a canonicalized path.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let digest = Sha256::digest(path.to_string_lossy().as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex[..REPO_ID_HEX_LEN].to_string())
    }

    /// Get the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RepoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One commit in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitNode {
    /// Unique identifier of the commit
    pub hash: CommitHash,

    /// Parent hashes in commit order; the first parent is the mainline.
    ///
    /// Parents missing from the graph are implicit roots (truncated history).
    pub parents: Vec<CommitHash>,

    /// Local branches whose tip is this commit
    #[serde(default)]
    pub branches: BTreeSet<String>,

    /// Commit time (unix seconds). An ordering hint only, never ancestry.
    pub timestamp: i64,

    /// Generation row assigned by the layout (0 = newest)
    #[serde(default)]
    pub level: usize,

    /// Horizontal track assigned by the layout
    #[serde(default)]
    pub lane: usize,
}

impl CommitNode {
    /// Create an unlabelled node with no layout assigned.
    pub fn new(hash: impl Into<CommitHash>, parents: Vec<CommitHash>, timestamp: i64) -> Self {
        Self {
            hash: hash.into(),
            parents,
            branches: BTreeSet::new(),
            timestamp,
            level: 0,
            lane: 0,
        }
    }

    /// Returns `true` for a commit with no parents at all.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Returns `true` for a commit with two or more parents.
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.parents.len() >= 2
    }

    /// The mainline parent, if any.
    #[must_use]
    pub fn first_parent(&self) -> Option<&CommitHash> {
        self.parents.first()
    }
}

/// The commit DAG anchored at a HEAD commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitGraph {
    /// Nodes keyed by hash
    pub nodes: BTreeMap<CommitHash, CommitNode>,

    /// Local branch name to the commit it points at
    pub branch_tips: BTreeMap<String, CommitHash>,

    /// The commit this graph is anchored at (`None` for an empty repository)
    pub head_hash: Option<CommitHash>,

    /// The checked-out branch, if HEAD is not detached
    #[serde(default)]
    pub current_branch: Option<String>,

    /// Whether commits were dropped to respect the node cap
    #[serde(default)]
    pub truncated: bool,

    /// Number of commits offered to the builder before truncation
    #[serde(default)]
    pub total_commits: usize,
}

impl CommitGraph {
    /// Number of nodes in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by hash.
    #[must_use]
    pub fn get(&self, hash: &CommitHash) -> Option<&CommitNode> {
        self.nodes.get(hash)
    }

    /// Returns `true` if the graph contains `hash`.
    #[must_use]
    pub fn contains(&self, hash: &CommitHash) -> bool {
        self.nodes.contains_key(hash)
    }

    /// Branches whose tip is not part of the node set.
    #[must_use]
    pub fn missing_tips(&self) -> Vec<&str> {
        self.branch_tips
            .iter()
            .filter(|(_, hash)| !self.nodes.contains_key(*hash))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// A graph is partial when some branch tip points outside the node set.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.branch_tips
            .values()
            .any(|hash| !self.nodes.contains_key(hash))
    }

    /// Parent to children edges, restricted to parents inside the graph.
    ///
    /// Children are listed in node-map order for each parent.
    #[must_use]
    pub fn children(&self) -> BTreeMap<CommitHash, Vec<CommitHash>> {
        let mut children: BTreeMap<CommitHash, Vec<CommitHash>> = BTreeMap::new();
        for node in self.nodes.values() {
            for parent in &node.parents {
                if self.nodes.contains_key(parent) {
                    children
                        .entry(parent.clone())
                        .or_default()
                        .push(node.hash.clone());
                }
            }
        }
        children
    }

    /// Highest level in use, or `None` for an empty graph.
    #[must_use]
    pub fn max_level(&self) -> Option<usize> {
        self.nodes.values().map(|n| n.level).max()
    }

    /// Number of lanes needed to draw the graph.
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.nodes.values().map(|n| n.lane + 1).max().unwrap_or(0)
    }

    /// Nodes in display order: by level, newest first within a level.
    #[must_use]
    pub fn rows(&self) -> Vec<&CommitNode> {
        let mut rows: Vec<&CommitNode> = self.nodes.values().collect();
        rows.sort_by(|a, b| {
            a.level
                .cmp(&b.level)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
                .then_with(|| a.hash.cmp(&b.hash))
        });
        rows
    }
}

/// The repository's local branches as reported by the version-control tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSummary {
    /// The commit HEAD resolves to (`None` for an empty repository)
    pub head: Option<CommitHash>,

    /// The checked-out branch name (`None` when HEAD is detached)
    pub current: Option<String>,

    /// Every local branch and the commit it points at
    pub branches: BTreeMap<String, CommitHash>,
}

impl BranchSummary {
    /// Derive a summary from the branch labels the log parser attached.
    ///
    /// Used when branch listing fails: the labels come from the same log
    /// output, so they describe the branches at the time of the query. HEAD
    /// falls back to the newest commit, labelled or not; ties go to the
    /// lower hash.
    #[must_use]
    pub fn from_commits(commits: &BTreeMap<CommitHash, CommitNode>) -> Self {
        let mut branches = BTreeMap::new();
        for node in commits.values() {
            for name in &node.branches {
                branches.insert(name.clone(), node.hash.clone());
            }
        }

        let head = commits
            .values()
            .max_by(|a, b| {
                a.timestamp
                    .cmp(&b.timestamp)
                    .then_with(|| b.hash.cmp(&a.hash))
            })
            .map(|node| node.hash.clone());

        Self {
            head,
            current: None,
            branches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(hash: &str, parents: &[&str], timestamp: i64) -> CommitNode {
        CommitNode::new(
            hash,
            parents.iter().map(|p| CommitHash::from(*p)).collect(),
            timestamp,
        )
    }

    #[test]
    fn short_hash_is_seven_chars() {
        let hash = CommitHash::new("0123456789abcdef");
        assert_eq!(hash.short(), "0123456");
        assert_eq!(CommitHash::new("abc").short(), "abc");
    }

    #[test]
    fn repo_id_from_path_is_stable_and_sixteen_hex_chars() {
        let a = RepoId::from_path(Path::new("/work/project"));
        let b = RepoId::from_path(Path::new("/work/project"));
        let c = RepoId::from_path(Path::new("/work/other"));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 16);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn node_shape_predicates() {
        assert!(node("a", &[], 1).is_root());
        assert!(node("m", &["x", "y"], 1).is_merge());
        assert_eq!(
            node("b", &["a"], 1).first_parent(),
            Some(&CommitHash::from("a"))
        );
    }

    #[test]
    fn partial_when_tip_missing() {
        let mut graph = CommitGraph::default();
        graph.nodes.insert("a".into(), node("a", &[], 1));
        graph.branch_tips.insert("main".into(), "a".into());
        assert!(!graph.is_partial());

        graph.branch_tips.insert("gone".into(), "zzz".into());
        assert!(graph.is_partial());
        assert_eq!(graph.missing_tips(), vec!["gone"]);
    }

    #[test]
    fn children_ignore_parents_outside_graph() {
        let mut graph = CommitGraph::default();
        graph.nodes.insert("a".into(), node("a", &["outside"], 1));
        graph.nodes.insert("b".into(), node("b", &["a"], 2));
        graph.nodes.insert("c".into(), node("c", &["a"], 3));

        let children = graph.children();
        assert_eq!(children.len(), 1);
        assert_eq!(
            children[&CommitHash::from("a")],
            vec![CommitHash::from("b"), CommitHash::from("c")]
        );
    }

    #[test]
    fn summary_from_commit_labels() {
        let mut commits = BTreeMap::new();
        let mut tip = node("c", &["b"], 30);
        tip.branches.insert("main".to_string());
        commits.insert(tip.hash.clone(), tip);
        commits.insert("b".into(), node("b", &[], 20));

        let summary = BranchSummary::from_commits(&commits);
        assert_eq!(summary.head, Some(CommitHash::from("c")));
        assert_eq!(summary.branches["main"], CommitHash::from("c"));
        assert!(summary.current.is_none());
    }

    #[test]
    fn summary_head_is_newest_commit_even_when_unlabelled() {
        let mut commits = BTreeMap::new();
        let mut labelled = node("b", &["a"], 20);
        labelled.branches.insert("main".to_string());
        commits.insert(labelled.hash.clone(), labelled);
        commits.insert("a".into(), node("a", &[], 10));
        commits.insert("e".into(), node("e", &["a"], 30));
        commits.insert("d".into(), node("d", &["a"], 30));

        let summary = BranchSummary::from_commits(&commits);
        assert_eq!(summary.head, Some(CommitHash::from("d")));
        assert_eq!(summary.branches["main"], CommitHash::from("b"));
    }
}
