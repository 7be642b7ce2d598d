#![allow(dead_code)]

use std::collections::BTreeMap;

use taskgraph::config::{GraphFile, RawGraphFile, SchedulerConfig, TaskSpec};
use taskgraph::types::FailPoint;

/// Builder for `GraphFile` to simplify test setup.
pub struct GraphFileBuilder {
    config: RawGraphFile,
}

impl GraphFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawGraphFile {
                scheduler: SchedulerConfig::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskSpec) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.config.scheduler = scheduler;
        self
    }

    pub fn build(self) -> GraphFile {
        GraphFile::try_from(self.config).expect("Failed to build valid graph from builder")
    }
}

impl Default for GraphFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskSpec`.
pub struct TaskSpecBuilder {
    task: TaskSpec,
}

impl TaskSpecBuilder {
    pub fn new() -> Self {
        Self {
            task: TaskSpec::default(),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn work_ms(mut self, ms: u64) -> Self {
        self.task.work_ms = ms;
        self
    }

    pub fn start(mut self, val: bool) -> Self {
        self.task.start = val;
        self
    }

    pub fn fail(mut self, point: FailPoint) -> Self {
        self.task.fail = Some(point);
        self
    }

    pub fn build(self) -> TaskSpec {
        self.task
    }
}

impl Default for TaskSpecBuilder {
    fn default() -> Self {
        Self::new()
    }
}
