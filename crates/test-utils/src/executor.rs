use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use taskgraph::errors::{Result, TaskGraphError};
use taskgraph::exec::{ExecutorBackend, Job, ThreadExecutor};

/// Thread executor that counts started jobs and can be told to refuse
/// new ones.
#[derive(Clone)]
pub struct CountingExecutor {
    inner: Arc<ThreadExecutor>,
    started: Arc<AtomicUsize>,
    refuse: Arc<AtomicBool>,
}

impl CountingExecutor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ThreadExecutor::new("test-ctx")),
            started: Arc::new(AtomicUsize::new(0)),
            refuse: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of jobs successfully started.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Make every following `execute` call fail.
    pub fn refuse_new_jobs(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

impl Default for CountingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutorBackend for CountingExecutor {
    fn execute(&self, job: Job) -> Result<()> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TaskGraphError::Executor("refused by test".to_string()));
        }
        self.inner.execute(job)?;
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
