// src/scheduler/registry.rs

//! Task registration and the state shared between the scheduler, its
//! control loop and task execution contexts.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::errors::{Result, TaskGraphError};
use crate::exec::ExecutorBackend;
use crate::sync::Signal;
use crate::task::{AnyTask, FuncTask, Task, TaskContext, TaskHandle, TaskId};

static NEXT_SCHEDULER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct Shared {
    pub(crate) id: u64,
    pub(crate) executor: Arc<dyn ExecutorBackend>,
    /// Tasks under management, in registration order.
    pub(crate) tasks: Mutex<Vec<TaskHandle>>,
    pub(crate) running: AtomicBool,
    pub(crate) closing: AtomicBool,
    /// Serialises `run()` and `close()`.
    pub(crate) lifecycle: Mutex<()>,
    /// "Some task needs attention."
    pub(crate) wake: Arc<Signal>,
    /// Set by the control loop when it exits.
    pub(crate) drained: Signal,
    pub(crate) close_poll_interval: Duration,
}

impl Shared {
    pub(crate) fn new(executor: Arc<dyn ExecutorBackend>, close_poll_interval: Duration) -> Self {
        Self {
            id: NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed),
            executor,
            tasks: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
            wake: Arc::new(Signal::new()),
            drained: Signal::new(),
            close_poll_interval,
        }
    }

    pub(crate) fn lock_tasks(&self) -> MutexGuard<'_, Vec<TaskHandle>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable, thread-safe access to a scheduler's task registration.
///
/// Handed to every hook through [`TaskContext::scheduler`], so tasks can
/// spawn follow-up work from any execution context.
#[derive(Clone)]
pub struct SchedulerHandle {
    pub(crate) shared: Arc<Shared>,
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("id", &self.shared.id)
            .field("tasks", &self.len())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl SchedulerHandle {
    /// Register a task with no dependencies.
    ///
    /// The task is not started until [`TaskHandle::run`] is called.
    pub fn add_task<T: Task>(&self, task: T) -> TaskHandle {
        let name = task.name().to_string();
        self.register(name, Box::new(task), Vec::new())
    }

    /// Register a task that waits for `dependencies` to finish processing
    /// before it is initialized.
    ///
    /// Each dependency is kept alive (not uninitialized) until this task
    /// has been initialized. An empty list behaves like
    /// [`add_task`](Self::add_task).
    pub fn then_task<T: Task>(&self, dependencies: &[TaskHandle], task: T) -> Result<TaskHandle> {
        let deps = self.acquire_dependencies(dependencies)?;
        let name = task.name().to_string();
        Ok(self.register(name, Box::new(task), deps))
    }

    /// Register a closure as a task with no dependencies.
    pub fn add_func<F>(&self, func: F) -> TaskHandle
    where
        F: FnMut(&TaskContext<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.add_task(FuncTask::new(func))
    }

    /// Register a closure as a task depending on `dependencies`.
    pub fn then_func<F>(&self, dependencies: &[TaskHandle], func: F) -> Result<TaskHandle>
    where
        F: FnMut(&TaskContext<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        self.then_task(dependencies, FuncTask::new(func))
    }

    /// Number of tasks currently under management.
    pub fn len(&self) -> usize {
        self.shared.lock_tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn is_closing(&self) -> bool {
        self.shared.closing.load(Ordering::Acquire)
    }

    /// Take a reference on every dependency, or none of them.
    fn acquire_dependencies(&self, dependencies: &[TaskHandle]) -> Result<Vec<TaskHandle>> {
        let mut acquired: Vec<TaskHandle> = Vec::with_capacity(dependencies.len());

        for dep in dependencies {
            let err = if dep.owner() != self.shared.id {
                Some(TaskGraphError::ForeignDependency(dep.id()))
            } else if !dep.acquire_ref() {
                Some(TaskGraphError::DependencyReleased(dep.id()))
            } else {
                None
            };

            if let Some(err) = err {
                for taken in &acquired {
                    taken.release_ref();
                }
                return Err(err);
            }
            acquired.push(dep.clone());
        }

        Ok(acquired)
    }

    fn register(&self, name: String, body: Box<dyn AnyTask>, deps: Vec<TaskHandle>) -> TaskHandle {
        let id = TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed));
        let dep_ids: Vec<TaskId> = deps.iter().map(|d| d.id()).collect();
        let handle = TaskHandle::new(
            id,
            self.shared.id,
            name,
            body,
            deps,
            Arc::clone(&self.shared.wake),
        );

        self.shared.lock_tasks().push(handle.clone());

        debug!(
            task = %id,
            name = %handle.name(),
            state = %handle.state(),
            deps = ?dep_ids,
            "registered task"
        );

        // Always after the push, so the control loop cannot miss the task.
        self.shared.wake.set();
        handle
    }
}
