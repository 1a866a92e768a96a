//! Clarity CLI - Command-line interface
//!
//! Resolves quality preferences offline, edits the stored profile and runs
//! the deterministic simulation scenarios.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use clarity_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "clarity")]
#[command(about = "Playback quality resolution and application engine")]
struct Cli {
    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::default(), global = true)]
    log_level: CliLogLevel,

    /// Directory for the full debug log of the last run
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

// Simulations rely on the engine actor and the runner sharing one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_path = init_tracing(cli.log_level.into(), cli.logs_dir.as_deref())?;
    tracing::debug!("Full log of this run: {}", log_path.display());

    commands::handle_command(cli.command).await
}
