// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The filter is picked in this order:
//! 1. `--log-level` on the command line,
//! 2. `TASKGRAPH_LOG`, which takes full `EnvFilter` directives
//!    (`"debug"`, `"info,taskgraph::scheduler=trace"`),
//! 3. `info`.
//!
//! Output goes to stderr; stdout only carries the run report. Thread names
//! are printed because each execution context runs on its own named thread.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "TASKGRAPH_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))
}

/// Filter for the given CLI level and `TASKGRAPH_LOG` value.
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    let directive = match (cli_level, env.map(str::trim)) {
        (Some(level), _) => level.as_directive(),
        (None, Some(env)) if !env.is_empty() => env,
        _ => DEFAULT_DIRECTIVE,
    };

    EnvFilter::try_new(directive)
        .with_context(|| format!("invalid log filter `{directive}` (from {LOG_ENV_VAR})"))
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
