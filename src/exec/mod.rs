// src/exec/mod.rs

//! Execution substrate.
//!
//! - [`backend`] provides the `ExecutorBackend` trait the scheduler uses to
//!   start its control loop and every task's execution context.
//! - [`thread`] is the default backend: one OS thread per context.
//! - [`blocking`] runs contexts on a tokio runtime's blocking pool.

pub mod backend;
pub mod blocking;
pub mod thread;

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::errors::Result;
use crate::types::ExecutorKind;

pub use backend::{ExecutorBackend, Job};
pub use blocking::TokioExecutor;
pub use thread::ThreadExecutor;

/// Build the backend selected by `config.executor`.
///
/// `ExecutorKind::Tokio` must be called from inside a tokio runtime.
pub fn backend_from_config(config: &SchedulerConfig) -> Result<Arc<dyn ExecutorBackend>> {
    let backend: Arc<dyn ExecutorBackend> = match config.executor {
        ExecutorKind::Thread => Arc::new(ThreadExecutor::new(config.thread_name.clone())),
        ExecutorKind::Tokio => Arc::new(TokioExecutor::current()?),
    };
    Ok(backend)
}
