//! CLI argument parsing and command dispatch.
//!
//! This module provides the command-line interface for trellis using clap's
//! derive API.
//!
//! # Commands
//!
//! - `init`: Write the default configuration to `.trellis/config.yaml`
//! - `graph`: Print the laid-out commit graph
//! - `snapshot`: Print the cached graph without reading history
//! - `invalidate`: Drop every cached graph of the repository
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//! - `-C <dir>`: Run as if started in `<dir>`
//!
//! # Example
//!
//! ```bash
//! trellis graph -n 20
//! trellis graph --force --json
//! trellis -C ../other-repo snapshot
//! ```

mod args;
mod execute;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Re-export argument structs
pub use args::{GraphArgs, InitArgs, InvalidateArgs, SnapshotArgs};

/// Trellis - commit graph viewer
///
/// Lays out a repository's history as a DAG of levels and lanes, and keeps
/// the result cached under `.trellis/cache` so repeated queries stay cheap.
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Run as if trellis was started in this directory
    #[arg(short = 'C', global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Write the default configuration
    ///
    /// Creates `.trellis/config.yaml` at the repository root.
    Init(InitArgs),

    /// Print the commit graph
    ///
    /// Serves the graph from the memory or snapshot cache when possible,
    /// extends a cached graph when HEAD moved forward, and rebuilds from the
    /// history otherwise.
    Graph(GraphArgs),

    /// Print the cached graph without reading history
    ///
    /// Shows the most recent cached graph, which may be older than HEAD.
    Snapshot(SnapshotArgs),

    /// Drop every cached graph of the repository
    Invalidate(InvalidateArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        let dir = match &self.directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        match &self.command {
            Some(Commands::Init(args)) => execute::execute_init(&dir, args, output_mode).await,
            Some(Commands::Graph(args)) => {
                let app = App::from_directory(&dir).await?;
                execute::execute_graph(&app, args, output_mode).await
            }
            Some(Commands::Snapshot(args)) => {
                let app = App::from_directory(&dir).await?;
                execute::execute_snapshot(&app, args, output_mode).await
            }
            Some(Commands::Invalidate(args)) => {
                let app = App::from_directory(&dir).await?;
                execute::execute_invalidate(&app, args, output_mode).await
            }
            None => {
                println!("Trellis commit graph viewer");
                println!("Use --help for more information");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_no_command() {
        let cli = Cli::try_parse_from(["trellis"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_parse_graph_flags() {
        let cli = Cli::try_parse_from(["trellis", "graph", "--force", "-n", "5"]).unwrap();
        match cli.command {
            Some(Commands::Graph(args)) => {
                assert!(args.force);
                assert_eq!(args.limit, Some(5));
            }
            other => panic!("expected graph command, got {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["trellis", "snapshot", "--json", "-C", "/tmp/repo"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.directory, Some(PathBuf::from("/tmp/repo")));
    }

    #[rstest]
    #[case::zero_limit(&["trellis", "graph", "-n", "0"])]
    #[case::unknown_command(&["trellis", "blame"])]
    #[case::unknown_flag(&["trellis", "invalidate", "--everything"])]
    fn test_rejects_invalid_input(#[case] argv: &[&str]) {
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
