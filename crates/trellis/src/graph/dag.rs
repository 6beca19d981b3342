//! Commit DAG operations using petgraph.
//!
//! Edges point from a commit to each of its parents that is part of the node
//! set. Parents outside the set are implicit roots and get no edge.

use crate::domain::{CommitHash, CommitNode};
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Directed child-to-parent graph over a commit map.
#[derive(Debug)]
pub struct CommitDag {
    graph: DiGraph<CommitHash, ()>,
    node_map: HashMap<CommitHash, NodeIndex>,
}

impl CommitDag {
    /// Build the petgraph view of `nodes`.
    #[must_use]
    pub fn new(nodes: &BTreeMap<CommitHash, CommitNode>) -> Self {
        let mut graph = DiGraph::with_capacity(nodes.len(), nodes.len());
        let mut node_map = HashMap::with_capacity(nodes.len());

        for hash in nodes.keys() {
            let index = graph.add_node(hash.clone());
            node_map.insert(hash.clone(), index);
        }

        for node in nodes.values() {
            let Some(&from) = node_map.get(&node.hash) else {
                continue;
            };
            for parent in &node.parents {
                if let Some(&to) = node_map.get(parent) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self { graph, node_map }
    }

    /// Every commit reachable from `tip` over parent edges, `tip` included.
    ///
    /// Returns an empty set when `tip` is not part of the graph.
    #[must_use]
    pub fn ancestors(&self, tip: &CommitHash) -> HashSet<CommitHash> {
        let Some(&start) = self.node_map.get(tip) else {
            return HashSet::new();
        };

        let mut ancestors = HashSet::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(index) = dfs.next(&self.graph) {
            ancestors.insert(self.graph[index].clone());
        }
        ancestors
    }

    /// Returns `true` if the parent edges contain a cycle.
    ///
    /// Real histories never do, but a corrupted snapshot or a scripted
    /// history can.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        algo::is_cyclic_directed(&self.graph)
    }
}
