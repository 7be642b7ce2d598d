// src/scheduler/mod.rs

//! Task graph scheduler.
//!
//! - [`registry`] holds the shared state and the cloneable
//!   `SchedulerHandle` used to register tasks from any thread.
//! - [`control`] contains the control loop that advances task states.
//!
//! `TaskScheduler` itself owns the lifecycle: `run()` starts the control
//! loop on the execution backend, `close()` cancels every task and blocks
//! until the graph is drained.

pub mod control;
pub mod registry;

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::sync::{MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::SchedulerConfig;
use crate::errors::Result;
use crate::exec::{ExecutorBackend, Job, backend_from_config};

pub use registry::SchedulerHandle;
use registry::Shared;

/// Owner and driver of a task graph.
///
/// Task registration methods come from [`SchedulerHandle`] through
/// `Deref`. Dropping the scheduler closes it.
pub struct TaskScheduler {
    handle: SchedulerHandle,
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TaskScheduler").field(&self.handle).finish()
    }
}

impl Deref for TaskScheduler {
    type Target = SchedulerHandle;

    fn deref(&self) -> &SchedulerHandle {
        &self.handle
    }
}

impl TaskScheduler {
    /// Scheduler running on `executor` with default settings.
    pub fn new(executor: impl ExecutorBackend + 'static) -> Self {
        Self::with_config(executor, &SchedulerConfig::default())
    }

    pub fn with_config(executor: impl ExecutorBackend + 'static, config: &SchedulerConfig) -> Self {
        let executor: Arc<dyn ExecutorBackend> = Arc::new(executor);
        let poll = Duration::from_millis(config.close_poll_interval_ms.max(1));
        Self {
            handle: SchedulerHandle {
                shared: Arc::new(Shared::new(executor, poll)),
            },
        }
    }

    /// Build the backend named by `config.executor` and a scheduler on it.
    pub fn from_config(config: &SchedulerConfig) -> Result<Self> {
        let backend = backend_from_config(config)?;
        Ok(Self::with_config(backend, config))
    }

    /// Cloneable registration handle to this scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Start the control loop.
    ///
    /// No-op if it is already running or the scheduler is closing. Fails
    /// only if the execution backend cannot start the loop.
    pub fn run(&self) -> Result<()> {
        let shared = &self.handle.shared;

        if shared.closing.load(Ordering::Acquire) {
            debug!(scheduler = shared.id, "run() ignored: scheduler is closing");
            return Ok(());
        }

        let _lifecycle = lock_lifecycle(shared);
        if shared.running.load(Ordering::Acquire) {
            debug!(scheduler = shared.id, "run() ignored: already running");
            return Ok(());
        }

        shared.running.store(true, Ordering::Release);
        shared.drained.clear();

        let job: Job = {
            let shared = Arc::clone(shared);
            Box::new(move || control::control_loop(shared))
        };

        if let Err(e) = shared.executor.execute(job) {
            error!(scheduler = shared.id, error = %e, "could not start control loop");
            shared.running.store(false, Ordering::Release);
            return Err(e);
        }

        info!(scheduler = shared.id, tasks = self.len(), "scheduler started");
        shared.wake.set();
        Ok(())
    }

    /// Cancel every task and block until the graph is drained and the
    /// control loop has exited.
    ///
    /// Tasks registered while closing are cancelled too. No-op when the
    /// scheduler is not running. Must not be called from a task hook.
    pub fn close(&self) {
        let shared = &self.handle.shared;
        let _lifecycle = lock_lifecycle(shared);

        if !shared.running.load(Ordering::Acquire) {
            debug!(scheduler = shared.id, "close() ignored: not running");
            return;
        }

        shared.closing.store(true, Ordering::Release);
        shared.running.store(false, Ordering::Release);
        info!(scheduler = shared.id, tasks = self.len(), "closing scheduler; draining task graph");

        loop {
            shared.wake.set();
            for task in shared.lock_tasks().iter() {
                // Tasks spinning in `process` are expected to notice this
                // and return.
                task.cancel();
            }
            if shared.drained.wait_timeout(shared.close_poll_interval) {
                break;
            }
        }

        shared.drained.clear();
        shared.closing.store(false, Ordering::Release);
        info!(scheduler = shared.id, "scheduler drained");
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.close();
    }
}

fn lock_lifecycle(shared: &Shared) -> MutexGuard<'_, ()> {
    shared.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
}
