//! Command-line argument types.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::deps::DepsArgs;
use super::commands::serve::ServeArgs;

/// Top-level command line.
#[derive(Parser, Debug)]
#[command(name = "taskdeps")]
#[command(about = "Task dependency graph service", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Load configuration from this YAML file instead of .taskdeps/
    #[arg(short, long, global = true, env = "TASKDEPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Apply pending database migrations
    Migrate,
    /// Inspect and edit task dependencies
    Deps(DepsArgs),
}
