//! CLI argument structs for all commands.
//!
//! Each command has its own argument struct with clap derive attributes
//! for parsing and validation.

use clap::Parser;

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `graph` command
#[derive(Parser, Debug, Clone)]
pub struct GraphArgs {
    /// Ignore both caches and rebuild from the full history
    #[arg(short, long)]
    pub force: bool,

    /// Print at most this many commits (newest first)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,
}

/// Arguments for the `snapshot` command
#[derive(Parser, Debug, Clone)]
pub struct SnapshotArgs {
    /// Print at most this many commits (newest first)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: Option<u64>,
}

/// Arguments for the `invalidate` command
#[derive(Parser, Debug, Clone)]
pub struct InvalidateArgs {
    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}
