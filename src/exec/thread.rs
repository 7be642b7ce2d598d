// src/exec/thread.rs

//! OS-thread execution backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tracing::{debug, error};

use crate::errors::{Result, TaskGraphError};
use crate::exec::backend::{ExecutorBackend, Job};

/// Runs every job on a freshly spawned, named OS thread.
///
/// Threads are detached; the scheduler tracks completion through task
/// state, not through join handles.
#[derive(Debug)]
pub struct ThreadExecutor {
    name: String,
    spawned: AtomicUsize,
}

impl ThreadExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spawned: AtomicUsize::new(0),
        }
    }

    /// Number of threads started so far.
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::Relaxed)
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("taskgraph")
    }
}

impl ExecutorBackend for ThreadExecutor {
    fn execute(&self, job: Job) -> Result<()> {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}", self.name, n);

        match thread::Builder::new().name(name.clone()).spawn(job) {
            Ok(_) => {
                debug!(thread = %name, "spawned execution thread");
                Ok(())
            }
            Err(e) => {
                error!(thread = %name, error = %e, "failed to spawn execution thread");
                Err(TaskGraphError::Executor(format!(
                    "spawning thread '{name}': {e}"
                )))
            }
        }
    }
}
