//! # Subchain CLI Module
//!
//! This module implements the CLI interface for subchain.
//!
//! ## Available Commands
//!
//! - `run` - Build a plan, subscribe and print what it emits
//! - `inspect` - Print the assembled chain, outermost stage first
//! - `validate` - Parse and check a plan without building it
//! - `stress` - Attach many subscribers concurrently to one deep chain

mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use subchain_core::AssemblyError;
use thiserror::Error;

pub use commands::*;

// =============================================================================
// ERRORS
// =============================================================================

/// Everything a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Plan parse error: {0}")]
    Plan(String),

    /// The pipeline did not terminate in time.
    #[error("Pipeline did not terminate within {millis} ms")]
    Timeout { millis: u64 },

    /// The pipeline terminated with `on_error`.
    #[error("Pipeline failed: {0}")]
    Stream(String),

    /// A blocking task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Join(String),

    #[error("Stress check failed: {0}")]
    Stress(String),
}

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Subchain - stack-safe pipeline assembly
///
/// Builds push pipelines from plan files and attaches subscribers through
/// them without recursion, whatever the depth.
#[derive(Parser, Debug)]
#[command(name = "subchain")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a plan, subscribe and print the result
    Run {
        /// Path to the plan file (TOML or JSON)
        #[arg(short, long)]
        plan: PathBuf,

        /// How long to wait for termination, in milliseconds
        #[arg(short, long, default_value = "5000")]
        timeout_ms: u64,
    },

    /// Print every stage of the assembled chain
    Inspect {
        /// Path to the plan file (TOML or JSON)
        #[arg(short, long)]
        plan: PathBuf,

        /// Maximum number of stages to print
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Check a plan without building it
    Validate {
        /// Path to the plan file (TOML or JSON)
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Attach subscribers concurrently to one deep chain
    Stress {
        /// Number of identity operators in the chain
        #[arg(short, long, default_value = "100000")]
        depth: usize,

        /// Number of concurrent subscribers
        #[arg(short, long, default_value = "8")]
        attachers: usize,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CliError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Run { plan, timeout_ms }) => {
            cmd_run(&plan, timeout_ms, json_mode, cli.verbose).await
        }
        Some(Commands::Inspect { plan, limit }) => cmd_inspect(&plan, limit, json_mode).await,
        Some(Commands::Validate { plan }) => cmd_validate(&plan, json_mode),
        Some(Commands::Stress { depth, attachers }) => {
            cmd_stress(depth, attachers, json_mode).await
        }
        None => Cli::command()
            .print_help()
            .map_err(|e| CliError::Io(e.to_string())),
    }
}
