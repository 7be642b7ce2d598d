use std::str::FromStr;
use serde::Deserialize;

/// Which execution backend runs the control loop and task contexts.
///
/// - `Thread`: one named OS thread per execution context (default).
/// - `Tokio`: the blocking pool of the current tokio runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Thread,
    Tokio,
}

impl Default for ExecutorKind {
    fn default() -> Self {
        ExecutorKind::Thread
    }
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "thread" => Ok(ExecutorKind::Thread),
            "tokio" => Ok(ExecutorKind::Tokio),
            other => Err(format!(
                "invalid executor: {other} (expected \"thread\" or \"tokio\")"
            )),
        }
    }
}

/// Hook in which a simulated task of a graph file should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailPoint {
    Initialize,
    Process,
    Uninitialize,
}

impl FromStr for FailPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "initialize" => Ok(FailPoint::Initialize),
            "process" => Ok(FailPoint::Process),
            "uninitialize" => Ok(FailPoint::Uninitialize),
            other => Err(format!(
                "invalid fail point: {other} (expected \"initialize\", \"process\" or \"uninitialize\")"
            )),
        }
    }
}
