// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::fmt;

use thiserror::Error;

use crate::task::TaskId;

#[derive(Error, Debug)]
pub enum TaskGraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("dependency {0} belongs to a different scheduler")]
    ForeignDependency(TaskId),

    #[error("dependency {0} has already been released for teardown")]
    DependencyReleased(TaskId),

    #[error("execution backend failed: {0}")]
    Executor(String),
}

pub type Result<T> = std::result::Result<T, TaskGraphError>;

/// Which task hook a captured failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Initialize,
    Process,
    Uninitialize,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookKind::Initialize => "initialize",
            HookKind::Process => "process",
            HookKind::Uninitialize => "uninitialize",
        };
        f.write_str(s)
    }
}

/// Failure captured on a task.
///
/// Stored on the task header the first time it happens and turned into a
/// cancellation request; it never escapes the control loop.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{hook} hook failed: {source}")]
    Hook {
        hook: HookKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("{hook} hook panicked: {message}")]
    Panic { hook: HookKind, message: String },

    #[error("could not start execution context: {source}")]
    Spawn {
        #[source]
        source: TaskGraphError,
    },
}

impl TaskError {
    /// Hook the failure came from, if any.
    pub fn hook(&self) -> Option<HookKind> {
        match self {
            TaskError::Hook { hook, .. } | TaskError::Panic { hook, .. } => Some(*hook),
            TaskError::Spawn { .. } => None,
        }
    }

    /// Build a `Panic` variant from a caught unwind payload.
    pub(crate) fn from_panic(hook: HookKind, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskError::Panic { hook, message }
    }
}
