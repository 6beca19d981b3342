//! Level and lane assignment.
//!
//! Levels are generations: every commit sits on a strictly lower level than
//! each of its parents, and levels are contiguous from 0 (newest). Lanes are
//! horizontal tracks. Lane 0 belongs to the primary branch, a line of history
//! keeps its lane down its first parents, and a fork point's newest child
//! keeps the lane while its siblings take the lowest free one.
//!
//! Layout is deterministic: ties are broken by timestamp, then by hash, so
//! the full-rebuild and incremental paths lay out equal node sets equally.

use super::dag::CommitDag;
use crate::domain::{CommitGraph, CommitHash, CommitNode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::warn;

/// Lane reserved for the primary branch's first-parent line.
pub const MAIN_LANE: usize = 0;

/// Branch names tried, in order, when choosing the primary branch.
const PRIMARY_BRANCHES: [&str; 2] = ["main", "master"];

/// Assign `level` and `lane` to every node of `graph`.
///
/// An empty graph is returned unchanged.
#[must_use]
pub fn layout(mut graph: CommitGraph) -> CommitGraph {
    if graph.nodes.is_empty() {
        return graph;
    }

    let dag = CommitDag::new(&graph.nodes);

    let levels = assign_levels(&graph.nodes, &dag);
    for node in graph.nodes.values_mut() {
        node.level = levels.get(&node.hash).copied().unwrap_or_default();
    }

    let lanes = assign_lanes(&graph, &dag);
    for node in graph.nodes.values_mut() {
        node.lane = lanes.get(&node.hash).copied().unwrap_or_default();
    }

    graph
}

/// Returns `true` if every edge inside the graph goes from a lower level to
/// a strictly higher one.
#[must_use]
pub fn is_strictly_leveled(graph: &CommitGraph) -> bool {
    graph.nodes.values().all(|node| {
        node.parents
            .iter()
            .filter_map(|parent| graph.nodes.get(parent))
            .all(|parent| parent.level > node.level)
    })
}

/// Nodes sorted newest first, ties broken by hash.
fn newest_first(nodes: &BTreeMap<CommitHash, CommitNode>) -> Vec<&CommitNode> {
    let mut order: Vec<&CommitNode> = nodes.values().collect();
    order.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.hash.cmp(&b.hash))
    });
    order
}

/// Iterate to a fixpoint where every child is above its parents, then
/// compact to contiguous levels.
fn assign_levels(
    nodes: &BTreeMap<CommitHash, CommitNode>,
    dag: &CommitDag,
) -> HashMap<CommitHash, usize> {
    let order = newest_first(nodes);
    let mut levels: HashMap<&CommitHash, i64> = order
        .iter()
        .zip(0_i64..)
        .map(|(node, level)| (&node.hash, level))
        .collect();

    let max_passes = nodes.len();
    let mut converged = false;
    for _ in 0..max_passes {
        let mut changed = false;
        for node in &order {
            let lowest_parent = node
                .parents
                .iter()
                .filter_map(|parent| levels.get(parent))
                .min()
                .copied();
            let Some(lowest_parent) = lowest_parent else {
                continue;
            };
            if let Some(level) = levels.get_mut(&node.hash) {
                if *level >= lowest_parent {
                    *level = lowest_parent - 1;
                    changed = true;
                }
            }
        }
        if !changed {
            converged = true;
            break;
        }
    }

    if !converged {
        let violations = order
            .iter()
            .filter(|node| {
                node.parents
                    .iter()
                    .filter_map(|parent| levels.get(parent))
                    .any(|parent_level| *parent_level <= levels[&node.hash])
            })
            .count();
        if violations > 0 {
            warn!(
                passes = max_passes,
                violations,
                cyclic = dag.has_cycle(),
                "Leveling did not converge, keeping partial result"
            );
        }
    }

    let distinct: BTreeSet<i64> = levels.values().copied().collect();
    let rank: HashMap<i64, usize> = distinct
        .into_iter()
        .enumerate()
        .map(|(rank, level)| (level, rank))
        .collect();

    levels
        .into_iter()
        .map(|(hash, level)| (hash.clone(), rank[&level]))
        .collect()
}

/// The branch whose first-parent line owns lane 0.
///
/// `main`, else `master`, else the checked-out branch, else the
/// alphabetically first branch. Only tips inside the graph are considered.
fn primary_branch<'a>(
    tips: &BTreeMap<&'a str, &'a CommitHash>,
    current: Option<&'a str>,
) -> Option<&'a str> {
    PRIMARY_BRANCHES
        .iter()
        .copied()
        .find(|name| tips.contains_key(name))
        .or_else(|| current.filter(|name| tips.contains_key(name)))
        .or_else(|| tips.keys().next().copied())
}

fn first_parent_chain(
    nodes: &BTreeMap<CommitHash, CommitNode>,
    tip: &CommitHash,
) -> HashSet<CommitHash> {
    let mut chain = HashSet::new();
    let mut current = nodes.get(tip);
    while let Some(node) = current {
        if !chain.insert(node.hash.clone()) {
            break;
        }
        current = node.first_parent().and_then(|parent| nodes.get(parent));
    }
    chain
}

fn lowest_free_lane(reserved: &HashMap<CommitHash, usize>, first: usize) -> usize {
    let taken: HashSet<usize> = reserved.values().copied().collect();
    (first..).find(|lane| !taken.contains(lane)).unwrap_or(first)
}

/// Walk the nodes top-down, handing each node's lane to its first parent.
fn assign_lanes(graph: &CommitGraph, dag: &CommitDag) -> HashMap<CommitHash, usize> {
    let nodes = &graph.nodes;
    let tips: BTreeMap<&str, &CommitHash> = graph
        .branch_tips
        .iter()
        .filter(|(_, hash)| nodes.contains_key(*hash))
        .map(|(name, hash)| (name.as_str(), hash))
        .collect();

    let primary = primary_branch(&tips, graph.current_branch.as_deref());
    let mainline = primary
        .and_then(|name| tips.get(name))
        .map(|tip| first_parent_chain(nodes, tip))
        .unwrap_or_default();
    let first_free = if primary.is_some() { MAIN_LANE + 1 } else { MAIN_LANE };

    let branch_ancestors: BTreeMap<&str, HashSet<CommitHash>> = tips
        .iter()
        .map(|(name, tip)| (*name, dag.ancestors(tip)))
        .collect();

    let mut order: Vec<&CommitNode> = nodes.values().collect();
    order.sort_by(|a, b| {
        a.level
            .cmp(&b.level)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
            .then_with(|| a.hash.cmp(&b.hash))
    });

    let mut lanes: HashMap<CommitHash, usize> = HashMap::with_capacity(nodes.len());
    // Lane promised to a parent by the child that reached it first.
    let mut reserved: HashMap<CommitHash, usize> = HashMap::new();
    let mut branch_lanes: BTreeMap<&str, usize> = BTreeMap::new();

    for node in order {
        let inherited = reserved.remove(&node.hash);
        let is_root = node.parents.iter().all(|parent| !nodes.contains_key(parent));

        let lane = if mainline.contains(&node.hash) {
            MAIN_LANE
        } else if let Some(lane) = inherited {
            lane
        } else if let Some(lane) = is_root
            .then(|| laned_branch_containing(&node.hash, &branch_ancestors, &branch_lanes))
            .flatten()
        {
            lane
        } else {
            lowest_free_lane(&reserved, first_free)
        };

        lanes.insert(node.hash.clone(), lane);
        for name in &node.branches {
            branch_lanes.entry(name.as_str()).or_insert(lane);
        }

        if let Some(parent) = node.first_parent() {
            let claimable = nodes.contains_key(parent)
                && !mainline.contains(parent)
                && !lanes.contains_key(parent)
                && !reserved.contains_key(parent);
            if claimable {
                reserved.insert(parent.clone(), lane);
            }
        }
    }

    // A merge always sits on its first parent's lane. Oldest first, so a
    // merge whose first parent is itself a merge sees the final lane.
    let mut merges: Vec<&CommitNode> = nodes.values().filter(|n| n.is_merge()).collect();
    merges.sort_by(|a, b| b.level.cmp(&a.level).then_with(|| a.hash.cmp(&b.hash)));
    for merge in merges {
        let parent_lane = merge
            .first_parent()
            .and_then(|parent| lanes.get(parent))
            .copied();
        if let Some(parent_lane) = parent_lane {
            lanes.insert(merge.hash.clone(), parent_lane);
        }
    }

    lanes
}

fn laned_branch_containing(
    hash: &CommitHash,
    branch_ancestors: &BTreeMap<&str, HashSet<CommitHash>>,
    branch_lanes: &BTreeMap<&str, usize>,
) -> Option<usize> {
    branch_ancestors
        .iter()
        .filter(|(_, ancestors)| ancestors.contains(hash))
        .find_map(|(name, _)| branch_lanes.get(name).copied())
}

/// Pixel spacing used to turn `(lane, level)` into drawing coordinates.
///
/// Only the integer layout is stable; coordinates are a presentation aid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpacing {
    /// Offset applied to both axes
    pub base: f32,
    /// Horizontal distance between lanes
    pub lane_spacing: f32,
    /// Vertical distance between levels
    pub level_spacing: f32,
}

impl Default for LayoutSpacing {
    fn default() -> Self {
        Self {
            base: 8.0,
            lane_spacing: 16.0,
            level_spacing: 24.0,
        }
    }
}

impl LayoutSpacing {
    /// X position of a lane
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn lane_x(&self, lane: usize) -> f32 {
        self.base + lane as f32 * self.lane_spacing
    }

    /// Y position of a level
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn level_y(&self, level: usize) -> f32 {
        self.base + level as f32 * self.level_spacing
    }

    /// `(x, y)` of a laid-out node.
    #[must_use]
    pub fn coordinates(&self, node: &CommitNode) -> (f32, f32) {
        (self.lane_x(node.lane), self.level_y(node.level))
    }
}
