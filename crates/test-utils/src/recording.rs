use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use taskgraph::{HookKind, Task, TaskContext, TaskState};

/// One hook call observed by a [`RecordingTask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEvent {
    pub task: String,
    pub hook: HookKind,
}

/// Shared, ordered log of hook calls across tasks.
#[derive(Debug, Clone, Default)]
pub struct HookLog {
    events: Arc<Mutex<Vec<HookEvent>>>,
}

impl HookLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, task: &str, hook: HookKind) {
        self.events.lock().unwrap().push(HookEvent {
            task: task.to_string(),
            hook,
        });
    }

    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Index of the first `hook` call of `task`.
    pub fn position(&self, task: &str, hook: HookKind) -> Option<usize> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .position(|e| e.task == task && e.hook == hook)
    }

    pub fn has(&self, task: &str, hook: HookKind) -> bool {
        self.position(task, hook).is_some()
    }

    pub fn count(&self, task: &str, hook: HookKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.task == task && e.hook == hook)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

/// How a [`RecordingTask`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Misbehave {
    Fail(HookKind),
    Panic(HookKind),
}

/// Task that logs every hook call and can be configured to fail, panic or
/// spin until cancelled.
pub struct RecordingTask {
    name: String,
    log: HookLog,
    misbehave: Option<Misbehave>,
    until_cancelled: bool,
    /// States of the dependencies as seen from `initialize`.
    pub seen_dependency_states: Arc<Mutex<Vec<TaskState>>>,
}

impl RecordingTask {
    pub fn new(name: &str, log: &HookLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            misbehave: None,
            until_cancelled: false,
            seen_dependency_states: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_in(mut self, hook: HookKind) -> Self {
        self.misbehave = Some(Misbehave::Fail(hook));
        self
    }

    pub fn panicking_in(mut self, hook: HookKind) -> Self {
        self.misbehave = Some(Misbehave::Panic(hook));
        self
    }

    /// Keep `process` busy until the task is cancelled.
    pub fn until_cancelled(mut self) -> Self {
        self.until_cancelled = true;
        self
    }

    fn hook(&self, hook: HookKind) -> anyhow::Result<()> {
        self.log.push(&self.name, hook);
        match self.misbehave {
            Some(Misbehave::Fail(h)) if h == hook => bail!("{} failed in {}", self.name, hook),
            Some(Misbehave::Panic(h)) if h == hook => panic!("{} panicked in {}", self.name, hook),
            _ => Ok(()),
        }
    }
}

impl Task for RecordingTask {
    fn initialize(&mut self, cx: &TaskContext<'_>) -> anyhow::Result<()> {
        {
            let mut seen = self.seen_dependency_states.lock().unwrap();
            seen.extend(cx.dependencies().iter().map(|d| d.state()));
        }
        self.hook(HookKind::Initialize)
    }

    fn process(&mut self, cx: &TaskContext<'_>) -> anyhow::Result<()> {
        self.hook(HookKind::Process)?;
        while self.until_cancelled && !cx.is_cancelled() {
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    fn uninitialize(&mut self, _cx: &TaskContext<'_>) -> anyhow::Result<()> {
        self.hook(HookKind::Uninitialize)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
