//! Property tests for the level/lane layout over random histories.

use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use trellis::domain::{BranchSummary, CommitGraph, CommitHash, CommitNode};
use trellis::graph::layout::is_strictly_leveled;
use trellis::graph::{layout, GraphBuilder};

mod common;
use common::hash;

/// One commit: two candidate parent picks, whether to merge, and a
/// timestamp that may disagree with ancestry.
type CommitSeed = (u8, u8, bool, i64);

/// Build a random DAG. Parents always point at older indices, so the input
/// is acyclic; timestamps are random, so clocks can be skewed.
fn history(seeds: &[CommitSeed], tips: &[u8]) -> CommitGraph {
    let mut commits = BTreeMap::new();
    for (i, (first, second, merge, timestamp)) in seeds.iter().enumerate() {
        let mut parents = Vec::new();
        if i > 0 {
            parents.push(CommitHash::new(hash(usize::from(*first) % i)));
            let other = CommitHash::new(hash(usize::from(*second) % i));
            if *merge && !parents.contains(&other) {
                parents.push(other);
            }
        }
        let node = CommitNode::new(hash(i), parents, *timestamp);
        commits.insert(node.hash.clone(), node);
    }

    let mut branches = BTreeMap::new();
    let names = ["main", "feature", "topic"];
    for (name, tip) in names.iter().zip(tips) {
        branches.insert(
            (*name).to_string(),
            CommitHash::new(hash(usize::from(*tip) % seeds.len())),
        );
    }
    let summary = BranchSummary {
        head: branches.get("main").cloned(),
        current: Some("main".to_string()),
        branches,
    };

    GraphBuilder::new(1000).build(commits, &summary)
}

fn seeds() -> impl Strategy<Value = Vec<CommitSeed>> {
    prop::collection::vec(
        (any::<u8>(), any::<u8>(), any::<bool>(), 0_i64..1_000),
        1..40,
    )
}

fn tips() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=3)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn every_parent_is_on_a_higher_level(seeds in seeds(), tips in tips()) {
        let graph = layout(history(&seeds, &tips));
        prop_assert!(is_strictly_leveled(&graph));
    }

    #[test]
    fn levels_are_contiguous_from_zero(seeds in seeds(), tips in tips()) {
        let graph = layout(history(&seeds, &tips));
        let levels: BTreeSet<usize> = graph.nodes.values().map(|n| n.level).collect();
        let expected: BTreeSet<usize> = (0..levels.len()).collect();
        prop_assert_eq!(levels, expected);
    }

    #[test]
    fn layout_is_deterministic(seeds in seeds(), tips in tips()) {
        let once = layout(history(&seeds, &tips));
        let again = layout(history(&seeds, &tips));
        let twice = layout(once.clone());
        prop_assert_eq!(&once, &again);
        prop_assert_eq!(&once, &twice);
    }

    #[test]
    fn lanes_stay_within_node_count(seeds in seeds(), tips in tips()) {
        let graph = layout(history(&seeds, &tips));
        prop_assert!(graph.lane_count() <= graph.len());
    }

    #[test]
    fn merges_sit_on_their_first_parent_lane(seeds in seeds(), tips in tips()) {
        let graph = layout(history(&seeds, &tips));
        for node in graph.nodes.values().filter(|n| n.is_merge()) {
            let parent = node.first_parent().and_then(|p| graph.get(p));
            if let Some(parent) = parent {
                prop_assert_eq!(node.lane, parent.lane, "merge {}", node.hash);
            }
        }
    }

    #[test]
    fn main_first_parent_line_owns_lane_zero(seeds in seeds(), tip in any::<u8>()) {
        let graph = layout(history(&seeds, &[tip]));
        let mut current = graph.branch_tips.get("main").and_then(|tip| graph.get(tip));
        while let Some(node) = current {
            prop_assert_eq!(node.lane, 0, "mainline commit {}", node.hash);
            current = node.first_parent().and_then(|p| graph.get(p));
        }
    }
}

#[test]
fn fork_and_merge_scenario() {
    // 0 <- 1 <- 3 (main, merge of 1 and 2)
    //  \- 2 (feature)
    let seeds = [(0, 0, false, 10), (0, 0, false, 20), (0, 0, false, 30), (1, 2, true, 40)];
    let graph = layout(history(&seeds, &[3, 2]));

    let at = |n: usize| {
        let node = graph.get(&CommitHash::new(hash(n))).unwrap();
        (node.level, node.lane)
    };
    assert_eq!(at(3), (0, 0));
    assert_eq!(at(2), (1, 1));
    assert_eq!(at(1), (2, 0));
    assert_eq!(at(0), (3, 0));
}
