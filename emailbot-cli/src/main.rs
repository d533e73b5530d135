//! Emailbot — download a mailbox and process each message exactly once.
//!
//! # Usage
//!
//! ```text
//! emailbot run --server <spool> --username <name> [--mailbox INBOX] [--messages-dir messages]
//!              [--config <file>] [--new-key synced] [--no-new] [--print-all] [--no-prompt]
//! emailbot history <item.eml | dir> [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{history::HistoryArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "emailbot",
    version,
    about = "Copy emails from a mailbox to your computer and process each one exactly once",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync the mailbox, then run the processing phases.
    Run(RunArgs),

    /// Show the processing history recorded for messages.
    History(HistoryArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::History(args) => args.run(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
