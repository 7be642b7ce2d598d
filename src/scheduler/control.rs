// src/scheduler/control.rs

//! The control loop and one pass over the task graph.
//!
//! Every pass works on a snapshot of the task set and advances each task
//! by at most one step. Tasks that reached `Ended` are removed and
//! destroyed at the end of the pass.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::{debug, error, info, trace};

use crate::errors::{HookKind, TaskError};
use crate::exec::Job;
use crate::scheduler::registry::{SchedulerHandle, Shared};
use crate::task::{Task, TaskContext, TaskHandle, TaskState};

/// What the control loop does with a task on this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Cancelled while waiting: release the dependency waits.
    PropagateCancel,
    /// Every dependency finished processing: `Wait` → `Created`.
    Promote,
    /// Run `initialize` and release dependencies: `Created` → `InQueue`.
    Initialize,
    /// Spawn the execution context: `InQueue` → `Stopped`.
    Launch,
    /// No dependent left: run `uninitialize`, `Canceling` → `Ended`.
    Uninitialize,
    Idle,
}

fn next_step(task: &TaskHandle) -> Step {
    match task.state() {
        TaskState::Wait => {
            let deps = task.dependencies();
            if deps.iter().all(|d| d.cancel_signal().is_set()) {
                Step::Promote
            } else if task.is_cancelled() {
                Step::PropagateCancel
            } else {
                Step::Idle
            }
        }
        TaskState::Created => Step::Initialize,
        TaskState::InQueue => Step::Launch,
        TaskState::Canceling => Step::Uninitialize,
        TaskState::Stopped | TaskState::Executing | TaskState::Ended => Step::Idle,
    }
}

/// Body of the control loop's execution context.
pub(crate) fn control_loop(shared: Arc<Shared>) {
    info!(scheduler = shared.id, "control loop started");
    let scheduler = SchedulerHandle {
        shared: Arc::clone(&shared),
    };

    loop {
        shared.wake.wait();

        if !shared.running.load(Ordering::Acquire) && shared.lock_tasks().is_empty() {
            break;
        }

        run_pass(&scheduler);
    }

    info!(scheduler = shared.id, "control loop finished");
    drop(scheduler);
    shared.drained.set();
}

/// Advance every registered task by one step, then drop ended tasks.
pub(crate) fn run_pass(scheduler: &SchedulerHandle) {
    let shared = &scheduler.shared;

    // Cleared before reading task state: anything changing state after
    // this point sets it again.
    shared.wake.clear();
    let snapshot: Vec<TaskHandle> = shared.lock_tasks().clone();
    trace!(scheduler = shared.id, tasks = snapshot.len(), "control pass");

    let mut progressed = false;
    for task in &snapshot {
        progressed |= step(scheduler, task);
    }

    if progressed {
        shared.wake.set();
    }

    remove_ended_tasks(shared);
}

fn step(scheduler: &SchedulerHandle, task: &TaskHandle) -> bool {
    match next_step(task) {
        Step::PropagateCancel => propagate_cancel(task),
        Step::Promote => task.advance(TaskState::Created),
        Step::Initialize => {
            on_initialize(scheduler, task);
            true
        }
        Step::Launch => {
            launch(scheduler, task);
            true
        }
        Step::Uninitialize => {
            if !task.try_retire() {
                return false;
            }
            on_uninitialize(scheduler, task);
            true
        }
        Step::Idle => false,
    }
}

fn propagate_cancel(task: &TaskHandle) -> bool {
    let mut changed = false;
    for dep in task.dependencies() {
        if !dep.cancel_signal().is_set() {
            debug!(task = %task.id(), dep = %dep.id(), "releasing wait on dependency of cancelled task");
            dep.cancel_signal().set();
            changed = true;
        }
    }
    changed
}

fn on_initialize(scheduler: &SchedulerHandle, task: &TaskHandle) {
    let deps = task.dependencies();

    if !task.is_cancelled() {
        task.mark_initialized();
        let cx = TaskContext::new(scheduler, task, &deps);
        call_hook(task, HookKind::Initialize, |body| body.initialize(&cx));
    }

    // Dependencies may be torn down once every dependent got this far,
    // whether or not `initialize` succeeded.
    for dep in task.take_dependencies() {
        dep.release_ref();
    }

    task.advance(TaskState::InQueue);
}

fn launch(scheduler: &SchedulerHandle, task: &TaskHandle) {
    task.advance(TaskState::Stopped);

    let job: Job = {
        let scheduler = scheduler.clone();
        let task = task.clone();
        Box::new(move || execute(&scheduler, &task))
    };

    if let Err(e) = scheduler.shared.executor.execute(job) {
        error!(task = %task.id(), name = %task.name(), error = %e, "could not start task execution context");
        task.fail(TaskError::Spawn { source: e });
        finish(task);
    }
}

/// Body of a task's execution context.
fn execute(scheduler: &SchedulerHandle, task: &TaskHandle) {
    task.wait_play();

    if !task.is_cancelled() && !task.has_error() {
        task.advance(TaskState::Executing);
        let cx = TaskContext::new(scheduler, task, &[]);
        call_hook(task, HookKind::Process, |body| body.process(&cx));
    }

    finish(task);
}

/// Processing is over: release dependents waiting on this task.
fn finish(task: &TaskHandle) {
    task.advance(TaskState::Canceling);
    task.cancel_signal().set();
    task.wake_scheduler();
}

fn on_uninitialize(scheduler: &SchedulerHandle, task: &TaskHandle) {
    if task.is_initialized() {
        let cx = TaskContext::new(scheduler, task, &[]);
        call_hook(task, HookKind::Uninitialize, |body| body.uninitialize(&cx));
    }
    task.advance(TaskState::Ended);
}

/// Run a hook, turning errors and panics into a captured task failure.
fn call_hook(
    task: &TaskHandle,
    hook: HookKind,
    f: impl FnOnce(&mut dyn Task) -> anyhow::Result<()>,
) {
    let outcome = task.with_body(|body| catch_unwind(AssertUnwindSafe(|| f(body))));

    match outcome {
        Some(Ok(Ok(()))) => {}
        Some(Ok(Err(source))) => task.fail(TaskError::Hook { hook, source }),
        Some(Err(payload)) => task.fail(TaskError::from_panic(hook, payload)),
        None => debug!(task = %task.id(), %hook, "hook skipped: body already destroyed"),
    }
}

fn remove_ended_tasks(shared: &Shared) {
    let ended: Vec<TaskHandle> = {
        let mut tasks = shared.lock_tasks();
        let (ended, live): (Vec<TaskHandle>, Vec<TaskHandle>) = tasks
            .drain(..)
            .partition(|t| t.state() == TaskState::Ended);
        *tasks = live;
        if tasks.is_empty() {
            shared.wake.clear();
        }
        ended
    };

    // Later registrations first, mirroring construction order.
    for task in ended.iter().rev() {
        task.destroy();
    }
}
