// src/plan/mod.rs

//! Turning a validated graph file into tasks on a scheduler.
//!
//! - [`work`] holds the simulated task body.
//! - [`report`] collects what happened once the scheduler closed.

pub mod report;
pub mod work;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::GraphFile;
use crate::errors::{Result, TaskGraphError};
use crate::scheduler::SchedulerHandle;
use crate::task::TaskHandle;

pub use report::{Journal, RunReport, TaskReport};
pub use work::SimulatedTask;

/// Tasks created from a graph file.
#[derive(Debug)]
pub struct Plan {
    handles: Vec<(String, TaskHandle)>,
    started: Vec<TaskHandle>,
    awaited: Vec<TaskHandle>,
    journal: Journal,
}

impl Plan {
    /// Create every task of `graph` on `scheduler`, dependencies first, and
    /// call `run()` on the ones marked `start = true`.
    pub fn build(scheduler: &SchedulerHandle, graph: &GraphFile) -> Result<Self> {
        let journal = Journal::new();
        let mut by_name: HashMap<&str, TaskHandle> = HashMap::new();
        let mut handles = Vec::with_capacity(graph.task.len());
        let mut started = Vec::new();
        let mut awaited = Vec::new();
        let stranded = graph.stranded();

        for name in graph.creation_order() {
            let spec = graph
                .task
                .get(name)
                .ok_or_else(|| TaskGraphError::TaskNotFound(name.clone()))?;

            let deps = spec
                .after
                .iter()
                .map(|dep| {
                    by_name
                        .get(dep.as_str())
                        .cloned()
                        .ok_or_else(|| TaskGraphError::TaskNotFound(dep.clone()))
                })
                .collect::<Result<Vec<_>>>()?;

            let task = SimulatedTask::new(name.clone(), spec, journal.clone());
            let handle = scheduler.then_task(&deps, task)?;

            if spec.start {
                handle.run();
                started.push(handle.clone());
                if stranded.contains(name.as_str()) {
                    warn!(task = %name, "started task depends on an unstarted task; it only ends when the scheduler closes");
                } else {
                    awaited.push(handle.clone());
                }
            }

            debug!(task = %name, id = %handle.id(), start = spec.start, "planned task");
            by_name.insert(name.as_str(), handle.clone());
            handles.push((name.clone(), handle));
        }

        info!(tasks = handles.len(), started = started.len(), "task graph built");
        Ok(Self {
            handles,
            started,
            awaited,
            journal,
        })
    }

    pub fn handles(&self) -> &[(String, TaskHandle)] {
        &self.handles
    }

    pub fn handle(&self, name: &str) -> Option<&TaskHandle> {
        self.handles
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, h)| h)
    }

    /// Handles of the tasks that were started.
    pub fn started(&self) -> &[TaskHandle] {
        &self.started
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Started tasks that can finish without the scheduler closing: every
    /// task they depend on is started too.
    pub fn awaited(&self) -> &[TaskHandle] {
        &self.awaited
    }

    /// Block until every [`awaited`](Self::awaited) task ended, or until
    /// `timeout` elapsed.
    ///
    /// Returns whether all of them ended.
    pub fn wait_awaited(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        for task in &self.awaited {
            match deadline {
                None => task.wait_ended(),
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if !task.wait_ended_timeout(left) {
                        return false;
                    }
                }
            }
        }
        true
    }

    pub fn report(&self) -> RunReport {
        RunReport::collect(&self.handles, &self.journal)
    }
}
