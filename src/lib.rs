// src/lib.rs

//! Task scheduling and dependency execution core.
//!
//! A [`TaskScheduler`] owns a graph of [`Task`]s and drives each one through
//! a monotonic lifecycle (`Wait` → `Created` → `InQueue` → `Stopped` →
//! `Executing` → `Canceling` → `Ended`) from a single control loop. Tasks
//! may depend on other tasks; a dependency is kept alive (not
//! uninitialized) until every dependent has been initialized, so
//! dependents can read its results. Cancellation is cooperative and
//! `close()` drains the whole graph.
//!
//! The scheduler runs its control loop and every task on an injected
//! [`ExecutorBackend`](exec::ExecutorBackend).

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod scheduler;
pub mod sync;
pub mod task;
pub mod types;

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::GraphFile;
use crate::config::loader::load_and_validate;
use crate::plan::Plan;

pub use crate::errors::{HookKind, TaskError, TaskGraphError};
pub use crate::scheduler::{SchedulerHandle, TaskScheduler};
pub use crate::task::{FuncTask, Task, TaskContext, TaskHandle, TaskId, TaskState};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - graph file loading
/// - scheduler + execution backend
/// - task creation from the graph
/// - Ctrl-C / deadline handling, then the drain
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let scheduler = TaskScheduler::from_config(&cfg.scheduler)?;
    let plan = Plan::build(&scheduler, &cfg)?;
    scheduler.run()?;

    // Tasks stuck behind an unstarted dependency are left to the drain.
    let awaited = plan.awaited().to_vec();
    let all_started_done = tokio::task::spawn_blocking(move || {
        for task in &awaited {
            task.wait_ended();
        }
    });

    let deadline = async {
        match args.deadline_ms {
            Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        res = all_started_done => {
            res?;
            info!("all started tasks finished");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received; cancelling task graph");
        }
        _ = deadline => {
            warn!(deadline_ms = ?args.deadline_ms, "deadline reached; cancelling remaining tasks");
        }
    }

    // close() blocks until the graph is drained.
    let report = tokio::task::spawn_blocking(move || {
        scheduler.close();
        plan.report()
    })
    .await?;

    report.print();

    match report.failed() {
        0 => Ok(()),
        n => Err(anyhow::anyhow!("{n} task(s) failed")),
    }
}

/// Simple dry-run output: print tasks, dependencies and settings.
fn print_dry_run(cfg: &GraphFile) {
    println!("taskgraph dry-run");
    println!("  scheduler.executor = {:?}", cfg.scheduler.executor);
    println!(
        "  scheduler.close_poll_interval_ms = {}",
        cfg.scheduler.close_poll_interval_ms
    );
    println!();

    let roots: Vec<&str> = cfg.roots().collect();
    println!("roots: {:?}", roots);
    println!("tasks ({}), in creation order:", cfg.task.len());
    for name in cfg.creation_order() {
        let Some(task) = cfg.task.get(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      work_ms: {}", task.work_ms);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if !task.start {
            println!("      start: false");
        }
        if let Some(fail) = task.fail {
            println!("      fail: {fail:?}");
        }
    }

    let stranded = cfg.stranded();
    if !stranded.is_empty() {
        println!();
        println!("warning: these started tasks wait on an unstarted task and only end on close:");
        for name in stranded {
            println!("  - {name}");
        }
    }
}
