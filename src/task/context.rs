// src/task/context.rs

//! The `Task` trait and the context handed to its hooks.

use std::any::Any;

use crate::scheduler::SchedulerHandle;
use crate::task::handle::TaskHandle;

/// A unit of work driven by a [`TaskScheduler`](crate::TaskScheduler).
///
/// Only [`process`](Task::process) is required. Hooks run on different
/// execution contexts: `initialize` and `uninitialize` on the scheduler's
/// control loop, `process` on the task's own context.
///
/// Returning `Err` from a hook, or panicking in it, records the failure on
/// the task and cancels it. `uninitialize` still runs afterwards if
/// `initialize` was entered.
pub trait Task: Send + 'static {
    /// Called once before `process`, unless the task was cancelled first.
    ///
    /// The tasks this one depends on are reachable through
    /// [`TaskContext::dependencies`] and are guaranteed not to be
    /// uninitialized yet, so their results can be read here with
    /// [`TaskHandle::inspect`]. A dependency whose wait was released by a
    /// cancelled sibling may still be processing; `inspect` then yields
    /// `None`.
    fn initialize(&mut self, cx: &TaskContext<'_>) -> anyhow::Result<()> {
        let _ = cx;
        Ok(())
    }

    /// The actual work.
    ///
    /// Long-running bodies should poll [`TaskContext::is_cancelled`] and
    /// return early; cancellation is cooperative.
    fn process(&mut self, cx: &TaskContext<'_>) -> anyhow::Result<()>;

    /// Called once after processing, if `initialize` was entered, and only
    /// after every dependent task has been initialized.
    fn uninitialize(&mut self, cx: &TaskContext<'_>) -> anyhow::Result<()> {
        let _ = cx;
        Ok(())
    }

    /// Label used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Object-safe view of a task body with access to its concrete type.
pub(crate) trait AnyTask: Send {
    fn as_task(&mut self) -> &mut dyn Task;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Task> AnyTask for T {
    fn as_task(&mut self) -> &mut dyn Task {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// What a hook can see of its surroundings.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext<'a> {
    scheduler: &'a SchedulerHandle,
    task: &'a TaskHandle,
    dependencies: &'a [TaskHandle],
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(
        scheduler: &'a SchedulerHandle,
        task: &'a TaskHandle,
        dependencies: &'a [TaskHandle],
    ) -> Self {
        Self {
            scheduler,
            task,
            dependencies,
        }
    }

    /// Scheduler that owns the task; new tasks may be added through it.
    pub fn scheduler(&self) -> &'a SchedulerHandle {
        self.scheduler
    }

    /// Handle of the task whose hook is running.
    pub fn task(&self) -> &'a TaskHandle {
        self.task
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.is_cancelled()
    }

    /// Tasks this one depends on.
    ///
    /// Only populated during `initialize`; the list is released right
    /// after it.
    pub fn dependencies(&self) -> &'a [TaskHandle] {
        self.dependencies
    }
}
