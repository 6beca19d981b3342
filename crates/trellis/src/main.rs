//! Trellis CLI binary.

use anyhow::Result;
use trellis::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the trellis CLI.
///
/// Uses tokio's current_thread runtime: each command resolves a single
/// repository, and its only waits are on git child processes and file I/O.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr so `--json` output on stdout stays parseable.
    // Example: RUST_LOG=trellis=debug,trellis_store=trace trellis graph
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trellis=info,trellis_store=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting trellis CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Trellis CLI completed successfully");
    Ok(())
}
