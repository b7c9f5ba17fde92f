//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Event tracker.
///
/// Records single, volume and timing events and delivers them to a
/// collection endpoint.
#[derive(Debug, Parser)]
#[command(name = "evt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the wire message instead of sending it.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fire a single event, or a volume event with --volume.
    Fire(FireArgs),

    /// Time a command and fire a timing event when it exits.
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct FireArgs {
    /// Event tag.
    pub tag: String,

    /// Quantity to attach to the event.
    #[arg(long, allow_negative_numbers = true)]
    pub volume: Option<i64>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Event tag.
    pub tag: String,

    /// Command to run, after `--`.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}
