// src/config/model.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::types::{ExecutorKind, FailPoint};

/// `[scheduler]` section, also usable on its own.
///
/// ```toml
/// [scheduler]
/// executor = "thread"
/// close_poll_interval_ms = 10
/// thread_name = "taskgraph"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Execution backend for the control loop and task contexts.
    #[serde(default)]
    pub executor: ExecutorKind,

    /// How long `close()` waits for the drain before re-sending
    /// cancellation to every task.
    #[serde(default = "default_close_poll_interval_ms")]
    pub close_poll_interval_ms: u64,

    /// Prefix for OS thread names (`thread` executor only).
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_close_poll_interval_ms() -> u64 {
    10
}

fn default_thread_name() -> String {
    "taskgraph".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorKind::default(),
            close_poll_interval_ms: default_close_poll_interval_ms(),
            thread_name: default_thread_name(),
        }
    }
}

/// Graph file exactly as deserialized, before validation.
///
/// ```toml
/// [scheduler]
/// executor = "thread"
///
/// [task.load]
/// work_ms = 20
///
/// [task.upload]
/// after = ["load"]
/// fail = "process"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawGraphFile {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// All tasks from `[task.<name>]`, keyed by name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskSpec>,
}

/// `[task.<name>]` section of a graph file.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    /// Simulated work time; cancellation is polled while it elapses.
    #[serde(default)]
    pub work_ms: u64,

    /// Names of tasks this one depends on.
    #[serde(default)]
    pub after: Vec<String>,

    /// Whether `run()` is called on the task after creation. Tasks left
    /// unstarted are only drained when the scheduler closes.
    #[serde(default = "default_start")]
    pub start: bool,

    /// Hook in which the task fails on purpose.
    #[serde(default)]
    pub fail: Option<FailPoint>,
}

fn default_start() -> bool {
    true
}

impl Default for TaskSpec {
    fn default() -> Self {
        Self {
            work_ms: 0,
            after: Vec::new(),
            start: default_start(),
            fail: None,
        }
    }
}

/// Validated graph file.
///
/// Only obtainable through `TryFrom<RawGraphFile>`, so every `after`
/// reference exists and the graph is acyclic.
#[derive(Debug, Clone)]
pub struct GraphFile {
    pub scheduler: SchedulerConfig,
    pub task: BTreeMap<String, TaskSpec>,
    /// Task names in dependency order (every task after its `after`).
    order: Vec<String>,
}

impl GraphFile {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerConfig,
        task: BTreeMap<String, TaskSpec>,
        order: Vec<String>,
    ) -> Self {
        Self {
            scheduler,
            task,
            order,
        }
    }

    /// Task names in an order where dependencies come first.
    pub fn creation_order(&self) -> &[String] {
        &self.order
    }

    /// Started tasks that cannot run before the scheduler closes, because
    /// a task they depend on, directly or transitively, has `start = false`.
    pub fn stranded(&self) -> BTreeSet<&str> {
        let mut blocked: BTreeSet<&str> = BTreeSet::new();

        for name in &self.order {
            let Some(spec) = self.task.get(name) else {
                continue;
            };
            let held = spec.after.iter().any(|dep| {
                blocked.contains(dep.as_str()) || self.task.get(dep).is_some_and(|d| !d.start)
            });
            if held {
                blocked.insert(name.as_str());
            }
        }

        blocked.retain(|name| self.task.get(*name).is_some_and(|spec| spec.start));
        blocked
    }

    /// Tasks with no `after` entries.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.task
            .iter()
            .filter(|(_, spec)| spec.after.is_empty())
            .map(|(name, _)| name.as_str())
    }
}
