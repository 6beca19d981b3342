//! Command execution logic.
//!
//! This module contains the implementation of all CLI commands.

use anyhow::Result;

use super::args::{GraphArgs, InitArgs, InvalidateArgs, SnapshotArgs};
use crate::app::App;
use crate::output::{self, OutputConfig, OutputMode};
use crate::vcs::GitCli;
use std::path::Path;

fn row_limit(limit: Option<u64>) -> Option<usize> {
    limit.map(|n| usize::try_from(n).unwrap_or(usize::MAX))
}

/// Execute the init command
pub async fn execute_init(dir: &Path, args: &InitArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::init;

    let root = GitCli::discover(dir).await?;
    let result = init::init(&root).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "trellis_dir": result.trellis_dir.display().to_string(),
            "config_file": result.config_file.display().to_string(),
        }))?,
        OutputMode::Text if !args.quiet => {
            println!("Initialized trellis in {}", result.trellis_dir.display());
            println!("  Config: {}", result.config_file.display());
        }
        OutputMode::Text => {}
    }

    Ok(())
}

/// Execute the graph command
pub async fn execute_graph(app: &App, args: &GraphArgs, output_mode: OutputMode) -> Result<()> {
    let resolved = app.engine().resolve(app.repo(), args.force).await?;
    tracing::debug!(source = %resolved.source, nodes = resolved.graph.len(), "Resolved graph");

    output::print_graph(
        &resolved.graph,
        Some(resolved.source),
        row_limit(args.limit),
        output_mode,
    )?;
    Ok(())
}

/// Execute the snapshot command
pub async fn execute_snapshot(
    app: &App,
    args: &SnapshotArgs,
    output_mode: OutputMode,
) -> Result<()> {
    match app.engine().get_snapshot(app.repo()).await {
        Some(graph) => output::print_graph(&graph, None, row_limit(args.limit), output_mode)?,
        None => match output_mode {
            OutputMode::Json => output::print_json(&serde_json::Value::Null)?,
            OutputMode::Text => {
                let config = OutputConfig::from_env();
                println!("{}", output::warning("no cached graph", &config));
            }
        },
    }
    Ok(())
}

/// Execute the invalidate command
pub async fn execute_invalidate(
    app: &App,
    args: &InvalidateArgs,
    output_mode: OutputMode,
) -> Result<()> {
    app.engine().invalidate_all(app.repo()).await;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "invalidated": app.repo().as_str(),
            "root": app.root().display().to_string(),
        }))?,
        OutputMode::Text if !args.quiet => {
            let config = OutputConfig::from_env();
            println!(
                "{} {}",
                output::info("Cleared cached graphs for", &config),
                app.root().display()
            );
        }
        OutputMode::Text => {}
    }
    Ok(())
}
