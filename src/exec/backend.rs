// src/exec/backend.rs

//! Pluggable execution substrate abstraction.
//!
//! The scheduler never creates threads itself. It hands closures to an
//! `ExecutorBackend`, which is free to run them on OS threads, a blocking
//! pool, fibers, or whatever the host application provides. A job may
//! block on [`Signal`](crate::sync::Signal)s for an unbounded time, so
//! backends must not run jobs inline on the caller's thread.
//!
//! - [`ThreadExecutor`](super::ThreadExecutor) spawns a named OS thread per
//!   job.
//! - [`TokioExecutor`](super::TokioExecutor) uses the blocking pool of a
//!   tokio runtime.
//! - Tests can wrap either of them to observe or fail spawns.

use std::sync::Arc;

use crate::errors::Result;

/// A unit of work handed to the execution substrate.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Trait abstracting where execution contexts run.
pub trait ExecutorBackend: Send + Sync {
    /// Start `job` on its own execution context.
    ///
    /// Returns an error only if the context could not be started; the job
    /// is dropped without running in that case.
    fn execute(&self, job: Job) -> Result<()>;
}

impl<E: ExecutorBackend + ?Sized> ExecutorBackend for Arc<E> {
    fn execute(&self, job: Job) -> Result<()> {
        (**self).execute(job)
    }
}

impl<E: ExecutorBackend + ?Sized> ExecutorBackend for Box<E> {
    fn execute(&self, job: Job) -> Result<()> {
        (**self).execute(job)
    }
}
