// src/plan/report.rs

//! Out-of-band results of a simulated run.
//!
//! Task bodies are destroyed when they end, so simulated tasks write what
//! they observed into a shared `Journal` while they run. The report is
//! built from the journal plus the task handles once the scheduler closed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::HookKind;
use crate::task::{TaskHandle, TaskState};

#[derive(Debug, Default)]
struct JournalInner {
    hooks: Vec<(String, HookKind)>,
    outputs: HashMap<String, u64>,
}

/// Shared record of hook calls and task outputs.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    inner: Arc<Mutex<JournalInner>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hook(&self, task: &str, hook: HookKind) {
        self.lock().hooks.push((task.to_string(), hook));
    }

    pub fn record_output(&self, task: &str, output: u64) {
        self.lock().outputs.insert(task.to_string(), output);
    }

    /// Every hook call so far, in call order.
    pub fn hooks(&self) -> Vec<(String, HookKind)> {
        self.lock().hooks.clone()
    }

    pub fn hooks_of(&self, task: &str) -> Vec<HookKind> {
        self.lock()
            .hooks
            .iter()
            .filter(|(name, _)| name == task)
            .map(|(_, hook)| *hook)
            .collect()
    }

    pub fn output_of(&self, task: &str) -> Option<u64> {
        self.lock().outputs.get(task).copied()
    }

    fn lock(&self) -> MutexGuard<'_, JournalInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Final view of one task.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub name: String,
    pub state: TaskState,
    pub cancelled: bool,
    pub error: Option<String>,
    pub output: Option<u64>,
    pub hooks: Vec<HookKind>,
}

/// Final view of a whole run, in task creation order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub tasks: Vec<TaskReport>,
}

impl RunReport {
    pub(crate) fn collect(handles: &[(String, TaskHandle)], journal: &Journal) -> Self {
        let tasks = handles
            .iter()
            .map(|(name, handle)| TaskReport {
                name: name.clone(),
                state: handle.state(),
                cancelled: handle.is_cancelled(),
                error: handle.error().map(|e| e.to_string()),
                output: journal.output_of(name),
                hooks: journal.hooks_of(name),
            })
            .collect();

        Self { tasks }
    }

    pub fn task(&self, name: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Number of tasks that captured an error.
    pub fn failed(&self) -> usize {
        self.tasks.iter().filter(|t| t.error.is_some()).count()
    }

    /// Number of tasks that produced an output.
    pub fn completed(&self) -> usize {
        self.tasks.iter().filter(|t| t.output.is_some()).count()
    }

    pub fn print(&self) {
        println!("taskgraph report ({} tasks)", self.tasks.len());
        for t in &self.tasks {
            let outcome = match (&t.error, t.output) {
                (Some(err), _) => format!("failed: {err}"),
                (None, Some(out)) => format!("done (output {out})"),
                (None, None) if t.cancelled => "cancelled".to_string(),
                (None, None) => "no output".to_string(),
            };
            println!("  - {:<20} {:<10} {}", t.name, t.state.to_string(), outcome);
        }
        println!(
            "completed: {}, failed: {}",
            self.completed(),
            self.failed()
        );
    }
}
