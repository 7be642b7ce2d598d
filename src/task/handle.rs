// src/task/handle.rs

//! Shared task header and the public handle to it.
//!
//! A registered task is split in two: the header (`TaskCell`) with atomics
//! and signals that any thread may touch, and the body (the user's `Task`
//! value) which only the scheduler's contexts lock. The body is dropped
//! when the task ends; the header lives as long as a handle does.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, TryLockError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::TaskError;
use crate::sync::Signal;
use crate::task::context::{AnyTask, Task};
use crate::task::state::{AtomicTaskState, TaskState};

/// Sentinel stored in `refs` once a task has been released for teardown.
const RETIRED: usize = usize::MAX;

/// Identifier of a task, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

struct TaskCell {
    id: TaskId,
    name: String,
    /// Id of the owning scheduler.
    owner: u64,
    state: AtomicTaskState,
    cancel: AtomicBool,
    initialized: AtomicBool,
    /// Number of dependents that still need this task alive.
    refs: AtomicUsize,
    error: OnceLock<TaskError>,
    dependencies: Mutex<Vec<TaskHandle>>,
    /// Set by `run()`; the execution context waits on it.
    play: Signal,
    /// Set once processing is over (or to release waiting dependents).
    cancel_signal: Signal,
    /// Set after the body has been dropped.
    ended: Signal,
    /// The owning scheduler's "work pending" signal.
    wake: Arc<Signal>,
    body: Mutex<Option<Box<dyn AnyTask>>>,
}

/// Cheap, cloneable reference to a registered task.
///
/// Stays valid after the task has ended and its body was destroyed; from
/// then on `state()` reports [`TaskState::Ended`] and `error()` still
/// returns whatever failure was captured.
#[derive(Clone)]
pub struct TaskHandle {
    cell: Arc<TaskCell>,
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.cell.id)
            .field("name", &self.cell.name)
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .field("refs", &self.refs())
            .finish_non_exhaustive()
    }
}

impl TaskHandle {
    pub(crate) fn new(
        id: TaskId,
        owner: u64,
        name: String,
        body: Box<dyn AnyTask>,
        dependencies: Vec<TaskHandle>,
        wake: Arc<Signal>,
    ) -> Self {
        let initial = if dependencies.is_empty() {
            TaskState::Created
        } else {
            TaskState::Wait
        };

        Self {
            cell: Arc::new(TaskCell {
                id,
                name,
                owner,
                state: AtomicTaskState::new(initial),
                cancel: AtomicBool::new(false),
                initialized: AtomicBool::new(false),
                refs: AtomicUsize::new(0),
                error: OnceLock::new(),
                dependencies: Mutex::new(dependencies),
                play: Signal::new(),
                cancel_signal: Signal::new(),
                ended: Signal::new(),
                wake,
                body: Mutex::new(Some(body)),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.cell.id
    }

    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn state(&self) -> TaskState {
        self.cell.state.load()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cell.cancel.load(Ordering::Acquire)
    }

    pub fn has_error(&self) -> bool {
        self.cell.error.get().is_some()
    }

    /// First failure captured on this task, if any.
    pub fn error(&self) -> Option<&TaskError> {
        self.cell.error.get()
    }

    /// Whether `initialize` was entered.
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized.load(Ordering::Acquire)
    }

    /// Number of dependents that have not been initialized yet.
    pub fn refs(&self) -> usize {
        match self.cell.refs.load(Ordering::Acquire) {
            RETIRED => 0,
            n => n,
        }
    }

    /// Tasks this one waits for. Empty once it has been initialized.
    pub fn dependencies(&self) -> Vec<TaskHandle> {
        lock(&self.cell.dependencies).clone()
    }

    /// Request cancellation.
    ///
    /// Idempotent. Also lets a task that was never `run()` progress through
    /// its cancellation path instead of waiting forever.
    pub fn cancel(&self) {
        if !self.cell.cancel.swap(true, Ordering::AcqRel) {
            debug!(task = %self.id(), name = %self.name(), "cancellation requested");
        }
        self.run();
        self.cell.wake.set();
    }

    /// Allow the task to start processing once the scheduler reaches it.
    ///
    /// Tasks are not started at creation so they can be used as
    /// dependencies of tasks created afterwards. Idempotent.
    pub fn run(&self) {
        self.cell.play.set();
    }

    /// Block until the task has ended and its body was destroyed.
    pub fn wait_ended(&self) {
        self.cell.ended.wait();
    }

    /// Like [`wait_ended`](Self::wait_ended) with a timeout. Returns whether
    /// the task ended in time.
    pub fn wait_ended_timeout(&self, timeout: Duration) -> bool {
        self.cell.ended.wait_timeout(timeout)
    }

    /// Run `f` on the task body once it finished processing.
    ///
    /// Meant for dependents reading results in `initialize`. Never blocks:
    /// returns `None` while the task is still before `Canceling`, while
    /// one of its hooks holds the body, once the body was destroyed, or if
    /// the body is not a `T`. A dependent can be initialized before its
    /// dependency processed when a cancelled sibling released the wait, so
    /// callers must handle `None`.
    pub fn inspect<T: Task, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        if self.state() < TaskState::Canceling {
            return None;
        }

        let body = match self.cell.body.try_lock() {
            Ok(body) => body,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!(task = %self.id(), name = %self.name(), "inspect skipped: body busy");
                return None;
            }
        };
        body.as_ref()
            .and_then(|b| b.as_any().downcast_ref::<T>())
            .map(f)
    }

    /// Whether both handles point to the same task.
    pub fn ptr_eq(&self, other: &TaskHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    pub(crate) fn owner(&self) -> u64 {
        self.cell.owner
    }

    pub(crate) fn advance(&self, next: TaskState) -> bool {
        match self.cell.state.advance(next) {
            Some(prev) => {
                debug!(task = %self.id(), name = %self.name(), from = %prev, to = %next, "state transition");
                true
            }
            None => false,
        }
    }

    pub(crate) fn mark_initialized(&self) {
        self.cell.initialized.store(true, Ordering::Release);
    }

    /// Store `err` (first failure wins) and cancel the task.
    pub(crate) fn fail(&self, err: TaskError) {
        warn!(task = %self.id(), name = %self.name(), error = %err, "task failed; cancelling");
        let _ = self.cell.error.set(err);
        self.cancel();
    }

    /// Take a reference on behalf of a new dependent.
    ///
    /// Fails once the task has been retired for teardown.
    pub(crate) fn acquire_ref(&self) -> bool {
        self.cell
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n != RETIRED).then_some(n + 1)
            })
            .is_ok()
    }

    pub(crate) fn release_ref(&self) {
        let _ = self
            .cell
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| match n {
                0 | RETIRED => None,
                n => Some(n - 1),
            });
    }

    /// Atomically claim the task for teardown if no dependent needs it.
    pub(crate) fn try_retire(&self) -> bool {
        self.cell
            .refs
            .compare_exchange(0, RETIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn take_dependencies(&self) -> Vec<TaskHandle> {
        std::mem::take(&mut *lock(&self.cell.dependencies))
    }

    pub(crate) fn cancel_signal(&self) -> &Signal {
        &self.cell.cancel_signal
    }

    pub(crate) fn wait_play(&self) {
        self.cell.play.wait();
    }

    pub(crate) fn wake_scheduler(&self) {
        self.cell.wake.set();
    }

    /// Run `f` on the body while holding its lock.
    pub(crate) fn with_body<R>(&self, f: impl FnOnce(&mut dyn Task) -> R) -> Option<R> {
        let mut body = lock(&self.cell.body);
        body.as_mut().map(|b| f(b.as_task()))
    }

    /// Drop the body and release waiters of `wait_ended`.
    pub(crate) fn destroy(&self) {
        let body = lock(&self.cell.body).take();
        drop(body);
        self.cell.ended.set();
        debug!(task = %self.id(), name = %self.name(), "task destroyed");
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
