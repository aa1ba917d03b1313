//! CLI argument parsing for the taskroute-worker binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "taskroute-worker", about = "Time-window route scheduling worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker (default if no subcommand given)
    Serve,
    /// Run database migrations and exit
    Migrate,
}
