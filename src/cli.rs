// src/cli.rs

//! CLI argument parsing for the `taskgraph` binary.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskgraph",
    version,
    about = "Run a simulated task graph on the task scheduler.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the graph file (TOML).
    ///
    /// Default: `Taskgraph.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Taskgraph.toml")]
    pub config: String,

    /// Close the scheduler after this many milliseconds even if started
    /// tasks are still pending.
    #[arg(long, value_name = "MS")]
    pub deadline_ms: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKGRAPH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
