//! The graph engine: cache orchestration per repository.
//!
//! A request walks four states and stops at the first that produces a
//! graph:
//!
//! 1. **Memory**: a valid in-memory entry for the repository
//! 2. **Persistent**: a snapshot for the current HEAD
//! 3. **Incremental**: a cached ancestor of HEAD extended with the delta
//! 4. **Full rebuild**: the bounded history parsed from scratch
//!
//! `force` skips straight to the full rebuild. Failures in any state are
//! logged and fall through to the next; if even the rebuild cannot fetch
//! history, the most recent cached graph (or an empty one) is returned
//! uncached.
//!
//! # Concurrency
//!
//! Each registered repository has its own mutex. [`GraphEngine::resolve`]
//! and [`GraphEngine::invalidate_all`] hold it for their whole run, so only
//! one of them is in flight per repository; different repositories proceed
//! in parallel. [`GraphEngine::get_snapshot`] only reads and takes no lock.

use super::entry::{ClockSource, SystemClock};
use super::memory::MemoryCache;
use super::persistent::SnapshotStore;
use crate::config::EngineConfig;
use crate::domain::{BranchSummary, CommitGraph, RepoId};
use crate::error::{Error, Result};
use crate::graph::{layout, GraphBuilder};
use crate::incremental::IncrementalUpdater;
use crate::parser::{parse_log, LOG_FORMAT};
use crate::vcs::{RevisionRange, VcsBackend};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use trellis_store::KvStore;

/// Where a returned graph came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphSource {
    /// Valid in-memory entry
    Memory,
    /// Snapshot for the current HEAD
    Persistent,
    /// Cached ancestor extended with new commits
    Incremental,
    /// Parsed from the full bounded history
    FullRebuild,
    /// History was unavailable; an older cached graph was returned
    Stale,
    /// History was unavailable and nothing was cached
    Empty,
}

impl fmt::Display for GraphSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::Persistent => "persistent",
            Self::Incremental => "incremental",
            Self::FullRebuild => "full-rebuild",
            Self::Stale => "stale",
            Self::Empty => "empty",
        };
        f.write_str(name)
    }
}

/// A graph together with the state that produced it.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The laid-out graph
    pub graph: Arc<CommitGraph>,
    /// Which cache state produced it
    pub source: GraphSource,
}

struct RepoSlot {
    vcs: Arc<dyn VcsBackend>,
    lock: Mutex<()>,
}

/// Serves laid-out commit graphs from a memory tier, a persistent tier and
/// the repository itself.
pub struct GraphEngine {
    config: EngineConfig,
    memory: MemoryCache<CommitGraph>,
    snapshots: SnapshotStore,
    repos: RwLock<HashMap<RepoId, Arc<RepoSlot>>>,
}

impl fmt::Debug for GraphEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphEngine")
            .field("config", &self.config)
            .field("snapshots", &self.snapshots)
            .finish_non_exhaustive()
    }
}

impl GraphEngine {
    /// Create an engine persisting snapshots in `store`.
    pub fn new(config: EngineConfig, store: Arc<dyn KvStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Create an engine whose memory tier checks TTLs against `clock`.
    pub fn with_clock(
        config: EngineConfig,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        Self {
            memory: MemoryCache::new(config.memory_ttl(), clock),
            snapshots: SnapshotStore::new(store, config.snapshot_retention),
            config,
            repos: RwLock::new(HashMap::new()),
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bind `repo` to the backend that reads its history.
    ///
    /// Registering an already known repository replaces its backend.
    pub async fn register(&self, repo: RepoId, vcs: Arc<dyn VcsBackend>) {
        let slot = Arc::new(RepoSlot {
            vcs,
            lock: Mutex::new(()),
        });
        self.repos.write().await.insert(repo, slot);
    }

    async fn slot(&self, repo: &RepoId) -> Option<Arc<RepoSlot>> {
        self.repos.read().await.get(repo).cloned()
    }

    /// The laid-out graph for `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRepository`] if `repo` was never registered.
    /// Every other failure degrades; see the module documentation.
    pub async fn get_graph(&self, repo: &RepoId, force_refresh: bool) -> Result<Arc<CommitGraph>> {
        Ok(self.resolve(repo, force_refresh).await?.graph)
    }

    /// Like [`get_graph`](Self::get_graph), also reporting where the graph
    /// came from.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRepository`] if `repo` was never registered.
    pub async fn resolve(&self, repo: &RepoId, force_refresh: bool) -> Result<Resolved> {
        let slot = self
            .slot(repo)
            .await
            .ok_or_else(|| Error::UnknownRepository(repo.clone()))?;
        let _guard = slot.lock.lock().await;

        if !force_refresh {
            if let Some(graph) = self.memory.get(repo).await {
                debug!(repo = %repo, "Memory cache hit");
                return Ok(Resolved {
                    graph,
                    source: GraphSource::Memory,
                });
            }
        }

        let summary = match slot.vcs.list_branches().await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(repo = %repo, error = %e, "Branch listing failed, rebuilding from log");
                None
            }
        };

        if !force_refresh {
            if let Some(resolved) = self
                .try_cached(repo, slot.vcs.as_ref(), summary.as_ref())
                .await
            {
                return Ok(resolved);
            }
        }

        match self.full_rebuild(slot.vcs.as_ref(), summary).await {
            Ok(graph) => {
                let graph = self.store(repo, graph).await;
                Ok(Resolved {
                    graph,
                    source: GraphSource::FullRebuild,
                })
            }
            Err(e) => {
                warn!(repo = %repo, error = %e, "History unavailable, serving cached graph");
                Ok(self.fallback(repo).await)
            }
        }
    }

    /// Persistent and incremental states. Both need the current HEAD.
    async fn try_cached(
        &self,
        repo: &RepoId,
        vcs: &dyn VcsBackend,
        summary: Option<&BranchSummary>,
    ) -> Option<Resolved> {
        let summary = summary?;
        let head = summary.head.as_ref()?;

        match self.snapshots.load(repo, head).await {
            // A snapshot is only current while every branch is where it was
            // when the snapshot was taken.
            Ok(Some(graph))
                if graph.branch_tips == summary.branches
                    && graph.current_branch == summary.current =>
            {
                debug!(repo = %repo, head = %head, "Persistent cache hit");
                let graph = Arc::new(graph);
                self.memory.insert(repo.clone(), Arc::clone(&graph)).await;
                return Some(Resolved {
                    graph,
                    source: GraphSource::Persistent,
                });
            }
            Ok(Some(_)) => debug!(repo = %repo, head = %head, "Branches moved since snapshot"),
            Ok(None) => {}
            Err(e) => warn!(repo = %repo, head = %head, error = %e, "Snapshot unusable"),
        }

        let index = match self.snapshots.load_index(repo).await {
            Ok(index) => index,
            Err(e) => {
                warn!(repo = %repo, error = %e, "Snapshot index unreadable");
                return None;
            }
        };

        let updater = IncrementalUpdater::new(vcs, &self.snapshots, &self.config);
        let graph = updater.try_incremental(repo, &index, head, summary).await?;
        let graph = self.store(repo, layout(graph)).await;
        Some(Resolved {
            graph,
            source: GraphSource::Incremental,
        })
    }

    async fn full_rebuild(
        &self,
        vcs: &dyn VcsBackend,
        summary: Option<BranchSummary>,
    ) -> Result<CommitGraph> {
        let range = RevisionRange::AllBranches {
            max_count: self.config.history_limit(),
        };
        let raw = vcs.query_log(&range, LOG_FORMAT).await?;
        let parsed = parse_log(&raw);
        if !parsed.warnings.is_empty() {
            warn!(skipped = parsed.warnings.len(), "Skipped malformed log records");
            for warning in &parsed.warnings {
                debug!("Skipped log record: {warning}");
            }
        }

        let summary = summary.unwrap_or_else(|| BranchSummary::from_commits(&parsed.commits));
        let graph = GraphBuilder::new(self.config.max_nodes).build(parsed.commits, &summary);
        let graph = layout(graph);
        info!(
            nodes = graph.len(),
            lanes = graph.lane_count(),
            truncated = graph.truncated,
            "Rebuilt commit graph"
        );
        Ok(graph)
    }

    /// Install `graph` in both tiers. Store failures only cost persistence.
    async fn store(&self, repo: &RepoId, graph: CommitGraph) -> Arc<CommitGraph> {
        let graph = Arc::new(graph);
        self.memory.insert(repo.clone(), Arc::clone(&graph)).await;

        if graph.head_hash.is_some() {
            if let Err(e) = self.snapshots.save(repo, &graph).await {
                warn!(repo = %repo, error = %e, "Failed to persist snapshot");
            }
        }
        graph
    }

    async fn fallback(&self, repo: &RepoId) -> Resolved {
        match self.get_snapshot(repo).await {
            Some(graph) => Resolved {
                graph,
                source: GraphSource::Stale,
            },
            None => Resolved {
                graph: Arc::new(CommitGraph::default()),
                source: GraphSource::Empty,
            },
        }
    }

    /// The cached graph for `repo`, if any, without touching the repository.
    ///
    /// Returns the valid memory entry, else the most recent persisted
    /// snapshot. Never runs an incremental update or a rebuild, never
    /// queries history, and writes nothing.
    pub async fn get_snapshot(&self, repo: &RepoId) -> Option<Arc<CommitGraph>> {
        if let Some(graph) = self.memory.peek(repo).await {
            return Some(graph);
        }
        match self.snapshots.latest(repo).await {
            Ok(graph) => graph.map(Arc::new),
            Err(e) => {
                warn!(repo = %repo, error = %e, "Snapshot index unreadable");
                None
            }
        }
    }

    /// Drop every cached graph of `repo` from both tiers.
    ///
    /// Store failures are logged; the memory entry is always cleared.
    pub async fn invalidate_all(&self, repo: &RepoId) {
        let slot = self.slot(repo).await;
        let _guard = match &slot {
            Some(slot) => Some(slot.lock.lock().await),
            None => None,
        };

        self.memory.remove(repo).await;
        match self.snapshots.invalidate(repo).await {
            Ok(()) => info!(repo = %repo, "Invalidated cached graphs"),
            Err(e) => warn!(repo = %repo, error = %e, "Failed to delete snapshots"),
        }
    }
}
