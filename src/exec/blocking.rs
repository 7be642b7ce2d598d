// src/exec/blocking.rs

//! Tokio blocking-pool execution backend.

use tokio::runtime::Handle;
use tracing::debug;

use crate::errors::{Result, TaskGraphError};
use crate::exec::backend::{ExecutorBackend, Job};

/// Runs jobs with `spawn_blocking` on a tokio runtime.
///
/// Jobs park on signals, so they go to the blocking pool and never onto
/// the async worker threads. Each live execution context holds one pool
/// thread; size the runtime's `max_blocking_threads` for the graph.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime the caller is currently running in.
    ///
    /// Fails when called outside of a tokio runtime.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| TaskGraphError::Executor(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(handle))
    }
}

impl ExecutorBackend for TokioExecutor {
    fn execute(&self, job: Job) -> Result<()> {
        // The join handle is dropped: completion is observed through task state.
        let _ = self.handle.spawn_blocking(job);
        debug!("queued job on tokio blocking pool");
        Ok(())
    }
}
