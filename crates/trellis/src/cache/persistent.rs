//! Persistent cache tier.
//!
//! Each repository owns two kinds of keys in the [`KvStore`]:
//!
//! - `graph:{repo}:{head}`: a laid-out graph snapshot
//! - `graphIndex:{repo}`: JSON array of the heads with a snapshot, most
//!   recent first, never longer than the retention bound
//!
//! # Snapshot Format
//!
//! Snapshots are JSONL: one header record, then one record per node.
//!
//! ```text
//! {"kind":"header","version":1,"head":"c3..","branch_tips":{"main":"c3.."},...}
//! {"kind":"node","hash":"c3..","parents":["b2.."],"timestamp":300,"level":0,"lane":0,...}
//! ```
//!
//! Node lines that fail to decode are skipped with a warning and the
//! remaining nodes are laid out again. A missing or foreign header makes the
//! whole snapshot unusable.

use crate::domain::{CommitGraph, CommitHash, CommitNode, RepoId};
use crate::error::{Error, Result};
use crate::graph::layout;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use trellis_store::{decode_jsonl_resilient, encode_jsonl, KvStore};
use tracing::{debug, warn};

/// Current snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

/// First record of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotHeader {
    version: u32,
    head: CommitHash,
    #[serde(default)]
    branch_tips: BTreeMap<String, CommitHash>,
    #[serde(default)]
    current_branch: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    total_commits: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum SnapshotRecord {
    Header(SnapshotHeader),
    Node(CommitNode),
}

/// Key of the snapshot for `head` in `repo`.
#[must_use]
pub fn snapshot_key(repo: &RepoId, head: &CommitHash) -> String {
    format!("graph:{repo}:{head}")
}

/// Key of the snapshot index for `repo`.
#[must_use]
pub fn index_key(repo: &RepoId) -> String {
    format!("graphIndex:{repo}")
}

/// Size-bounded snapshot storage on top of a [`KvStore`].
#[derive(Clone)]
pub struct SnapshotStore {
    store: Arc<dyn KvStore>,
    retention: usize,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

impl SnapshotStore {
    /// Keep at most `retention` snapshots per repository in `store`.
    pub fn new(store: Arc<dyn KvStore>, retention: usize) -> Self {
        Self { store, retention }
    }

    /// Maximum number of snapshots kept per repository.
    #[must_use]
    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Heads with a snapshot, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the index is not a JSON array
    /// of hashes.
    pub async fn load_index(&self, repo: &RepoId) -> Result<Vec<CommitHash>> {
        match self.store.get(&index_key(repo)).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// Load the snapshot for `head`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the snapshot header is missing
    /// or belongs to another head.
    pub async fn load(&self, repo: &RepoId, head: &CommitHash) -> Result<Option<CommitGraph>> {
        let Some(bytes) = self.store.get(&snapshot_key(repo, head)).await? else {
            return Ok(None);
        };
        decode_snapshot(&bytes, head).map(Some)
    }

    /// The most recent snapshot that can still be loaded.
    ///
    /// # Errors
    ///
    /// Returns an error only if the index itself cannot be read; unusable
    /// snapshots are skipped.
    pub async fn latest(&self, repo: &RepoId) -> Result<Option<CommitGraph>> {
        for head in self.load_index(repo).await? {
            match self.load(repo, &head).await {
                Ok(Some(graph)) => return Ok(Some(graph)),
                Ok(None) => debug!(repo = %repo, head = %head, "Indexed snapshot is missing"),
                Err(e) => warn!(repo = %repo, head = %head, error = %e, "Skipping unusable snapshot"),
            }
        }
        Ok(None)
    }

    /// Persist `graph` and move its head to the front of the index.
    ///
    /// Heads pushed past the retention bound are removed from the index and
    /// their snapshots deleted. Returns the evicted heads.
    ///
    /// The index is written before the snapshot and trimmed only after the
    /// evicted snapshots are gone, so a failure at any step leaves no stored
    /// snapshot that the index does not list.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph has no head or a store write fails.
    pub async fn save(&self, repo: &RepoId, graph: &CommitGraph) -> Result<Vec<CommitHash>> {
        let head = graph
            .head_hash
            .clone()
            .ok_or_else(|| Error::Snapshot("graph has no head commit".to_string()))?;

        let bytes = encode_snapshot(graph, &head)?;

        let mut index = match self.load_index(repo).await {
            Ok(index) => index,
            Err(e) => {
                warn!(repo = %repo, error = %e, "Snapshot index unreadable, starting a new one");
                Vec::new()
            }
        };
        index.retain(|h| *h != head);
        index.insert(0, head.clone());
        self.write_index(repo, &index).await?;

        self.store.set(&snapshot_key(repo, &head), &bytes).await?;

        let evicted = if index.len() > self.retention {
            index.split_off(self.retention)
        } else {
            Vec::new()
        };
        for old in &evicted {
            self.store.delete(&snapshot_key(repo, old)).await?;
            debug!(repo = %repo, head = %old, "Evicted snapshot");
        }
        if !evicted.is_empty() {
            self.write_index(repo, &index).await?;
        }

        Ok(evicted)
    }

    async fn write_index(&self, repo: &RepoId, index: &[CommitHash]) -> Result<()> {
        self.store
            .set(&index_key(repo), &serde_json::to_vec(index)?)
            .await?;
        Ok(())
    }

    /// Delete every indexed snapshot of `repo` and the index itself.
    ///
    /// # Errors
    ///
    /// Returns an error if a delete fails. An unreadable index is deleted
    /// without visiting its snapshots.
    pub async fn invalidate(&self, repo: &RepoId) -> Result<()> {
        let index = match self.load_index(repo).await {
            Ok(index) => index,
            Err(e) => {
                warn!(repo = %repo, error = %e, "Snapshot index unreadable, deleting it only");
                Vec::new()
            }
        };
        for head in &index {
            self.store.delete(&snapshot_key(repo, head)).await?;
        }
        self.store.delete(&index_key(repo)).await?;
        Ok(())
    }
}

fn encode_snapshot(graph: &CommitGraph, head: &CommitHash) -> Result<Vec<u8>> {
    let header = SnapshotRecord::Header(SnapshotHeader {
        version: SNAPSHOT_VERSION,
        head: head.clone(),
        branch_tips: graph.branch_tips.clone(),
        current_branch: graph.current_branch.clone(),
        truncated: graph.truncated,
        total_commits: graph.total_commits,
    });
    let records = std::iter::once(header).chain(
        graph
            .nodes
            .values()
            .cloned()
            .map(SnapshotRecord::Node),
    );
    Ok(encode_jsonl(records)?)
}

fn decode_snapshot(bytes: &[u8], head: &CommitHash) -> Result<CommitGraph> {
    let (records, warnings) = decode_jsonl_resilient::<SnapshotRecord>(bytes);
    let mut records = records.into_iter();

    let header = match records.next() {
        Some(SnapshotRecord::Header(header)) => header,
        _ => return Err(Error::Snapshot(format!("snapshot for {head} has no header"))),
    };
    if header.version != SNAPSHOT_VERSION {
        return Err(Error::Snapshot(format!(
            "unsupported snapshot version {}",
            header.version
        )));
    }
    if header.head != *head {
        return Err(Error::Snapshot(format!(
            "snapshot header names {} instead of {head}",
            header.head
        )));
    }

    let mut nodes = BTreeMap::new();
    for record in records {
        match record {
            SnapshotRecord::Node(node) => {
                nodes.insert(node.hash.clone(), node);
            }
            SnapshotRecord::Header(_) => {
                return Err(Error::Snapshot(format!(
                    "snapshot for {head} has more than one header"
                )));
            }
        }
    }

    let graph = CommitGraph {
        nodes,
        branch_tips: header.branch_tips,
        head_hash: Some(header.head),
        current_branch: header.current_branch,
        truncated: header.truncated,
        total_commits: header.total_commits,
    };

    if warnings.is_empty() {
        return Ok(graph);
    }

    for warning in &warnings {
        warn!(head = %head, "Snapshot {warning}");
    }
    Ok(layout(graph))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_store::MemoryStore;

    fn graph(head: &str) -> CommitGraph {
        let mut root = CommitNode::new("a0", vec![], 1);
        root.level = 1;
        let mut tip = CommitNode::new(head, vec!["a0".into()], 2);
        tip.branches.insert("main".to_string());
        let mut graph = CommitGraph {
            head_hash: Some(head.into()),
            ..CommitGraph::default()
        };
        graph.branch_tips.insert("main".to_string(), head.into());
        graph.nodes.insert(root.hash.clone(), root);
        graph.nodes.insert(tip.hash.clone(), tip);
        graph
    }

    fn snapshots(retention: usize) -> (SnapshotStore, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SnapshotStore::new(store.clone(), retention), store)
    }

    #[tokio::test]
    async fn save_then_load_returns_equal_graph() {
        let (snapshots, _) = snapshots(3);
        let repo = RepoId::from("r");
        let original = graph("b1");

        snapshots.save(&repo, &original).await.unwrap();
        let loaded = snapshots.load(&repo, &"b1".into()).await.unwrap();

        assert_eq!(loaded, Some(original));
    }

    #[tokio::test]
    async fn missing_snapshot_is_none() {
        let (snapshots, _) = snapshots(3);
        let loaded = snapshots.load(&"r".into(), &"b1".into()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn index_is_most_recent_first_and_deduplicated() {
        let (snapshots, _) = snapshots(3);
        let repo = RepoId::from("r");

        snapshots.save(&repo, &graph("b1")).await.unwrap();
        snapshots.save(&repo, &graph("b2")).await.unwrap();
        snapshots.save(&repo, &graph("b1")).await.unwrap();

        let index = snapshots.load_index(&repo).await.unwrap();
        assert_eq!(index, vec![CommitHash::from("b1"), CommitHash::from("b2")]);
    }

    #[tokio::test]
    async fn overflow_evicts_oldest_snapshot() {
        let (snapshots, store) = snapshots(2);
        let repo = RepoId::from("r");

        snapshots.save(&repo, &graph("b1")).await.unwrap();
        snapshots.save(&repo, &graph("b2")).await.unwrap();
        let evicted = snapshots.save(&repo, &graph("b3")).await.unwrap();

        assert_eq!(evicted, vec![CommitHash::from("b1")]);
        assert_eq!(snapshots.load_index(&repo).await.unwrap().len(), 2);
        assert!(!store.contains_key("graph:r:b1").await);
        assert!(store.contains_key("graph:r:b3").await);
    }

    #[tokio::test]
    async fn malformed_node_line_is_skipped() {
        let (snapshots, store) = snapshots(3);
        let repo = RepoId::from("r");
        snapshots.save(&repo, &graph("b1")).await.unwrap();

        let mut bytes = store.get("graph:r:b1").await.unwrap().unwrap();
        bytes.extend_from_slice(b"{\"kind\":\"node\",\"hash\":\n");
        store.set("graph:r:b1", &bytes).await.unwrap();

        let loaded = snapshots.load(&repo, &"b1".into()).await.unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn headerless_snapshot_is_an_error() {
        let (snapshots, store) = snapshots(3);
        store
            .set("graph:r:b1", b"{\"kind\":\"node\",\"hash\":\"b1\",\"parents\":[],\"timestamp\":1}\n")
            .await
            .unwrap();

        let result = snapshots.load(&"r".into(), &"b1".into()).await;
        assert!(matches!(result, Err(Error::Snapshot(_))));
    }

    #[tokio::test]
    async fn snapshot_for_other_head_is_an_error() {
        let (snapshots, store) = snapshots(3);
        let repo = RepoId::from("r");
        snapshots.save(&repo, &graph("b1")).await.unwrap();
        let bytes = store.get("graph:r:b1").await.unwrap().unwrap();
        store.set("graph:r:b2", &bytes).await.unwrap();

        assert!(snapshots.load(&repo, &"b2".into()).await.is_err());
    }

    #[tokio::test]
    async fn latest_skips_unusable_snapshots() {
        let (snapshots, store) = snapshots(3);
        let repo = RepoId::from("r");
        snapshots.save(&repo, &graph("b1")).await.unwrap();
        snapshots.save(&repo, &graph("b2")).await.unwrap();
        store.set("graph:r:b2", b"not json\n").await.unwrap();

        let latest = snapshots.latest(&repo).await.unwrap().unwrap();
        assert_eq!(latest.head_hash, Some(CommitHash::from("b1")));
    }

    #[tokio::test]
    async fn invalidate_removes_all_keys() {
        let (snapshots, store) = snapshots(3);
        let repo = RepoId::from("r");
        snapshots.save(&repo, &graph("b1")).await.unwrap();
        snapshots.save(&repo, &graph("b2")).await.unwrap();
        snapshots.save(&"other".into(), &graph("b1")).await.unwrap();

        snapshots.invalidate(&repo).await.unwrap();

        assert_eq!(
            store.keys().await,
            vec!["graph:other:b1".to_string(), "graphIndex:other".to_string()]
        );
    }

    #[tokio::test]
    async fn headless_graph_is_not_saved() {
        let (snapshots, store) = snapshots(3);
        let result = snapshots.save(&"r".into(), &CommitGraph::default()).await;
        assert!(result.is_err());
        assert!(store.is_empty().await);
    }

    /// Store whose deletes can be made to fail.
    #[derive(Default)]
    struct FlakyDeletes {
        inner: MemoryStore,
        failing: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl KvStore for FlakyDeletes {
        async fn get(&self, key: &str) -> trellis_store::Result<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &[u8]) -> trellis_store::Result<()> {
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> trellis_store::Result<()> {
            if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(std::io::Error::other("device unavailable").into());
            }
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn failed_eviction_leaves_every_snapshot_indexed() {
        let store = Arc::new(FlakyDeletes::default());
        let snapshots = SnapshotStore::new(store.clone(), 2);
        let repo = RepoId::from("r");
        snapshots.save(&repo, &graph("b1")).await.unwrap();
        snapshots.save(&repo, &graph("b2")).await.unwrap();

        store.failing.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(snapshots.save(&repo, &graph("b3")).await.is_err());

        let index = snapshots.load_index(&repo).await.unwrap();
        for key in store.inner.keys().await {
            if let Some(head) = key.strip_prefix("graph:r:") {
                assert!(index.contains(&CommitHash::from(head)), "{key} not indexed");
            }
        }

        // Once deletes work again, invalidation reaches every snapshot.
        store.failing.store(false, std::sync::atomic::Ordering::SeqCst);
        snapshots.invalidate(&repo).await.unwrap();
        assert!(store.inner.is_empty().await);
    }
}
