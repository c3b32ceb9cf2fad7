//! # cg
//!
//! Command-line surface over the Change Gate governance engine:
//! - `cg evaluate` - run an operation through the full engine
//! - `cg budget` - check an operation against the change budget only
//! - `cg history` - show recent decisions from the audit trail
//! - `cg verify` - check the audit trail's hash chain

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::ProjectPaths;

/// Change Gate: fail-closed governance for agent code edits.
#[derive(Parser)]
#[command(name = "cg", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an operation and print the decision as JSON.
    Evaluate(commands::evaluate::EvaluateArgs),
    /// Check an operation against the change budget.
    Budget(commands::budget::BudgetArgs),
    /// Show recent decisions.
    History {
        /// Path to the audit trail (defaults to .cg/decisions.jsonl).
        #[arg(long)]
        audit_log: Option<PathBuf>,
        /// Number of entries to show.
        #[arg(short, default_value = "10")]
        n: usize,
    },
    /// Verify the audit trail hash chain.
    Verify {
        /// Path to the audit trail (defaults to .cg/decisions.jsonl).
        #[arg(long)]
        audit_log: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cg_governance=warn".parse()?))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let paths = ProjectPaths::for_project(&project_root);

    match &cli.command {
        Commands::Evaluate(args) => commands::evaluate::execute(args, &paths),
        Commands::Budget(args) => commands::budget::execute(args, &paths),
        Commands::History { audit_log, n } => {
            commands::history::tail(&paths.audit_log_or(audit_log.as_deref()), *n)
        }
        Commands::Verify { audit_log } => {
            commands::history::verify(&paths.audit_log_or(audit_log.as_deref()))
        }
    }
}
