// src/task/state.rs

//! Task lifecycle states.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a task.
///
/// A task starts in `Wait` (it has dependencies) or `Created` (it has
/// none) and only ever moves forward until `Ended`, after which it is
/// destroyed. The derived ordering follows the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum TaskState {
    /// Waiting for the tasks it depends on to finish processing.
    Wait = 0,
    /// Ready to be initialized by the control loop.
    Created = 1,
    /// `initialize` has run (or was skipped); execution not yet spawned.
    InQueue = 2,
    /// Execution context spawned; waiting for the play signal.
    Stopped = 3,
    /// `process` is running.
    Executing = 4,
    /// Processing is over; waiting for dependents to release the task
    /// before `uninitialize`.
    Canceling = 5,
    /// Uninitialized; about to be removed and destroyed.
    Ended = 6,
}

impl TaskState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TaskState::Wait,
            1 => TaskState::Created,
            2 => TaskState::InQueue,
            3 => TaskState::Stopped,
            4 => TaskState::Executing,
            5 => TaskState::Canceling,
            _ => TaskState::Ended,
        }
    }

    pub fn is_ended(self) -> bool {
        self == TaskState::Ended
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Wait => "wait",
            TaskState::Created => "created",
            TaskState::InQueue => "in-queue",
            TaskState::Stopped => "stopped",
            TaskState::Executing => "executing",
            TaskState::Canceling => "canceling",
            TaskState::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// Atomic cell holding a `TaskState` that can only move forward.
#[derive(Debug)]
pub(crate) struct AtomicTaskState(AtomicU8);

impl AtomicTaskState {
    pub(crate) fn new(state: TaskState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if it is later than the current state.
    ///
    /// Returns the previous state when the transition happened.
    pub(crate) fn advance(&self, next: TaskState) -> Option<TaskState> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                (cur < next as u8).then_some(next as u8)
            })
            .ok()
            .map(TaskState::from_u8)
    }
}
