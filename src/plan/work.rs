// src/plan/work.rs

//! Simulated work used by graph files.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::bail;
use tracing::debug;

use crate::config::TaskSpec;
use crate::errors::HookKind;
use crate::plan::report::Journal;
use crate::task::{Task, TaskContext};
use crate::types::FailPoint;

/// Longest sleep between two cancellation checks.
const CANCEL_POLL: Duration = Duration::from_millis(5);

/// Task that "works" for a fixed time and produces a number derived from
/// its dependencies' outputs.
///
/// Output = 1 + sum of the outputs of its dependencies, so a chain of N
/// tasks ends with output N.
pub struct SimulatedTask {
    name: String,
    work: Duration,
    fail: Option<FailPoint>,
    journal: Journal,
    input: u64,
    output: Option<u64>,
}

impl SimulatedTask {
    pub fn new(name: impl Into<String>, spec: &TaskSpec, journal: Journal) -> Self {
        Self {
            name: name.into(),
            work: Duration::from_millis(spec.work_ms),
            fail: spec.fail,
            journal,
            input: 0,
            output: None,
        }
    }

    /// Result of `process`, once it completed.
    pub fn output(&self) -> Option<u64> {
        self.output
    }
}

impl Task for SimulatedTask {
    fn initialize(&mut self, cx: &TaskContext<'_>) -> anyhow::Result<()> {
        self.journal.record_hook(&self.name, HookKind::Initialize);

        self.input = cx
            .dependencies()
            .iter()
            .filter_map(|dep| dep.inspect(|t: &SimulatedTask| t.output).flatten())
            .sum();

        if self.fail == Some(FailPoint::Initialize) {
            bail!("simulated failure in initialize of '{}'", self.name);
        }
        Ok(())
    }

    fn process(&mut self, cx: &TaskContext<'_>) -> anyhow::Result<()> {
        self.journal.record_hook(&self.name, HookKind::Process);

        let deadline = Instant::now() + self.work;
        loop {
            if cx.is_cancelled() {
                debug!(task = %self.name, "cancelled while working");
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(CANCEL_POLL.min(deadline - now));
        }

        if self.fail == Some(FailPoint::Process) {
            bail!("simulated failure in process of '{}'", self.name);
        }

        let output = self.input + 1;
        self.output = Some(output);
        self.journal.record_output(&self.name, output);
        Ok(())
    }

    fn uninitialize(&mut self, _cx: &TaskContext<'_>) -> anyhow::Result<()> {
        self.journal.record_hook(&self.name, HookKind::Uninitialize);

        if self.fail == Some(FailPoint::Uninitialize) {
            bail!("simulated failure in uninitialize of '{}'", self.name);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
