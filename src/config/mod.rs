// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`): scheduler settings and
//!   the graph file used by the `taskgraph` binary.
//! - Load a graph file from disk (`loader.rs`).
//! - Validate dependencies, cycles and settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, scheduler_config_from_str};
pub use model::{GraphFile, RawGraphFile, SchedulerConfig, TaskSpec};
