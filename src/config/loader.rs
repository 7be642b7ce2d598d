// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{GraphFile, RawGraphFile, SchedulerConfig};
use crate::config::validate::validate_scheduler_config;
use crate::errors::Result;

/// Load a graph file from a given path and return the raw `RawGraphFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (DAG correctness, etc.). Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawGraphFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawGraphFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a graph file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - unknown or self `after` references,
///   - DAG cycles,
///   - scheduler settings sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<GraphFile> {
    let raw_config = load_from_path(&path)?;
    let config = GraphFile::try_from(raw_config)?;
    Ok(config)
}

/// Parse a standalone scheduler configuration (the body of a
/// `[scheduler]` table).
pub fn scheduler_config_from_str(s: &str) -> Result<SchedulerConfig> {
    let config: SchedulerConfig = toml::from_str(s)?;
    validate_scheduler_config(&config)?;
    Ok(config)
}

/// Default graph file location: `Taskgraph.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Taskgraph.toml")
}
