//! Output formatting for CLI commands.
//!
//! Graphs are printed either as text rows (one per commit, newest first) or
//! as JSON for programmatic use.
//!
//! Submodules:
//! - [`color`]: lane palette and styling helpers

pub mod color;

use crate::cache::GraphSource;
use crate::domain::{CommitGraph, CommitHash, CommitNode};
use serde::Serialize;
use std::collections::BTreeSet;
use std::env;
use std::fmt::Write as _;
use std::io::{self, Write};

pub use color::{info, warning};

use color::{bold, dimmed, in_lane};

/// Output mode for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text output
    Text,
    /// JSON output for programmatic use
    Json,
}

/// Configuration for text output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create an OutputConfig by reading from environment variables.
    ///
    /// Reads:
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `TRELLIS_COLOR`: Set to "0" or "false" to disable colors (default: true)
    pub fn from_env() -> Self {
        // Respect NO_COLOR standard (https://no-color.org/)
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("TRELLIS_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);

        Self { use_colors }
    }
}

/// One commit in JSON output.
#[derive(Debug, Serialize)]
struct NodeView<'a> {
    hash: &'a CommitHash,
    parents: &'a [CommitHash],
    children: Vec<CommitHash>,
    branches: &'a BTreeSet<String>,
    timestamp: i64,
    level: usize,
    lane: usize,
}

impl<'a> NodeView<'a> {
    fn new(node: &'a CommitNode, children: Vec<CommitHash>) -> Self {
        Self {
            hash: &node.hash,
            parents: &node.parents,
            children,
            branches: &node.branches,
            timestamp: node.timestamp,
            level: node.level,
            lane: node.lane,
        }
    }
}

/// A whole graph in JSON output, nodes in display order.
#[derive(Debug, Serialize)]
struct GraphView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<GraphSource>,
    head: Option<&'a CommitHash>,
    current_branch: Option<&'a str>,
    truncated: bool,
    total_commits: usize,
    lane_count: usize,
    partial: bool,
    nodes: Vec<NodeView<'a>>,
}

impl<'a> GraphView<'a> {
    fn new(graph: &'a CommitGraph, source: Option<GraphSource>, limit: Option<usize>) -> Self {
        let rows = graph.rows();
        let limit = limit.unwrap_or(rows.len());
        let mut children = graph.children();
        Self {
            source,
            head: graph.head_hash.as_ref(),
            current_branch: graph.current_branch.as_deref(),
            truncated: graph.truncated,
            total_commits: graph.total_commits,
            lane_count: graph.lane_count(),
            partial: graph.is_partial(),
            nodes: rows
                .into_iter()
                .take(limit)
                .map(|node| NodeView::new(node, children.remove(&node.hash).unwrap_or_default()))
                .collect(),
        }
    }
}

/// Print a value as pretty JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    writeln!(handle)?;
    Ok(())
}

/// Print `graph` in the requested mode, at most `limit` rows.
pub fn print_graph(
    graph: &CommitGraph,
    source: Option<GraphSource>,
    limit: Option<usize>,
    mode: OutputMode,
) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&GraphView::new(graph, source, limit)),
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for line in format_rows(graph, limit, &config) {
                writeln!(handle, "{line}")?;
            }
            writeln!(handle, "{}", format_summary(graph, source, &config))?;
            Ok(())
        }
    }
}

/// Render one text line per commit: lane marker, short hash, branch labels.
pub(crate) fn format_rows(
    graph: &CommitGraph,
    limit: Option<usize>,
    config: &OutputConfig,
) -> Vec<String> {
    let width = graph.lane_count().max(1) * 2;
    let head = graph.head_hash.as_ref();

    graph
        .rows()
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|node| {
            let marker = if Some(&node.hash) == head { "@" } else { "*" };
            let padding = " ".repeat(node.lane * 2);
            let column = format!("{padding}{}", in_lane(marker, node.lane, config));
            let fill = " ".repeat(width.saturating_sub(node.lane * 2 + 1));

            let mut line = format!(
                "{column}{fill} {} {}",
                in_lane(node.hash.short(), node.lane, config),
                dimmed(&format!("L{}", node.level), config),
            );
            if !node.branches.is_empty() {
                let labels: Vec<&str> = node.branches.iter().map(String::as_str).collect();
                let _ = write!(line, " ({})", bold(&labels.join(", "), config));
            }
            line
        })
        .collect()
}

/// One-line footer with counts and flags.
pub(crate) fn format_summary(
    graph: &CommitGraph,
    source: Option<GraphSource>,
    config: &OutputConfig,
) -> String {
    let mut summary = format!(
        "{} commits, {} lanes",
        graph.len(),
        graph.lane_count()
    );
    if let Some(source) = source {
        let _ = write!(summary, " [{source}]");
    }
    let mut text = dimmed(&summary, config);
    if graph.truncated {
        let note = format!("(truncated from {} commits)", graph.total_commits);
        let _ = write!(text, " {}", warning(&note, config));
    }
    let missing = graph.missing_tips();
    if !missing.is_empty() {
        let note = format!("(tips outside graph: {})", missing.join(", "));
        let _ = write!(text, " {}", warning(&note, config));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BranchSummary;
    use crate::graph::{layout, GraphBuilder};

    fn plain() -> OutputConfig {
        OutputConfig { use_colors: false }
    }

    fn fork() -> CommitGraph {
        let commits = [
            CommitNode::new("aaaaaaaaaa", vec![], 1),
            CommitNode::new("bbbbbbbbbb", vec!["aaaaaaaaaa".into()], 2),
            CommitNode::new("dddddddddd", vec!["aaaaaaaaaa".into()], 3),
        ]
        .into_iter()
        .map(|node| (node.hash.clone(), node))
        .collect();
        let summary = BranchSummary {
            head: Some("bbbbbbbbbb".into()),
            current: Some("main".to_string()),
            branches: [
                ("main".to_string(), CommitHash::from("bbbbbbbbbb")),
                ("topic".to_string(), CommitHash::from("dddddddddd")),
            ]
            .into_iter()
            .collect(),
        };
        layout(GraphBuilder::new(10).build(commits, &summary))
    }

    #[test]
    fn rows_show_lane_hash_and_labels() {
        let rows = format_rows(&fork(), None, &plain());

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], "  *  ddddddd L0 (topic)");
        assert_eq!(rows[1], "@    bbbbbbb L1 (main)");
        assert_eq!(rows[2], "*    aaaaaaa L2");
    }

    #[test]
    fn limit_caps_rows() {
        assert_eq!(format_rows(&fork(), Some(1), &plain()).len(), 1);
    }

    #[test]
    fn summary_reports_source_and_truncation() {
        let mut graph = fork();
        graph.truncated = true;
        graph.total_commits = 10;

        let text = format_summary(&graph, Some(GraphSource::Memory), &plain());

        assert_eq!(text, "3 commits, 2 lanes [memory] (truncated from 10 commits)");
    }

    #[test]
    fn json_view_lists_nodes_in_display_order() {
        let graph = fork();
        let view = GraphView::new(&graph, Some(GraphSource::FullRebuild), None);
        let value = serde_json::to_value(&view).unwrap();

        assert_eq!(value["source"], "full-rebuild");
        assert_eq!(value["lane_count"], 2);
        assert_eq!(value["nodes"][0]["hash"], "dddddddddd");
        assert_eq!(value["nodes"][0]["lane"], 1);
    }

    #[test]
    fn json_view_lists_children_of_each_node() {
        let graph = fork();
        let view = GraphView::new(&graph, None, None);
        let value = serde_json::to_value(&view).unwrap();

        let root = value["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|node| node["hash"] == "aaaaaaaaaa")
            .unwrap();
        assert_eq!(
            root["children"],
            serde_json::json!(["bbbbbbbbbb", "dddddddddd"])
        );
        assert_eq!(value["nodes"][0]["children"], serde_json::json!([]));
    }
}
