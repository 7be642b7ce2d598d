use std::error::Error;
use std::fs;
use std::time::Duration;

use taskgraph::cli::CliArgs;
use taskgraph::config::SchedulerConfig;
use taskgraph::plan::Plan;
use taskgraph::types::{ExecutorKind, FailPoint};
use taskgraph::{HookKind, TaskScheduler, TaskState};
use taskgraph_test_utils::builders::{GraphFileBuilder, TaskSpecBuilder};
use taskgraph_test_utils::{TEST_TIMEOUT, init_tracing, with_timeout, within_timeout};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn chain_passes_outputs_down() -> TestResult {
    init_tracing();

    let graph = GraphFileBuilder::new()
        .with_task("a", TaskSpecBuilder::new().work_ms(5).build())
        .with_task("b", TaskSpecBuilder::new().after("a").build())
        .with_task("c", TaskSpecBuilder::new().after("b").build())
        .build();

    let scheduler = TaskScheduler::from_config(&graph.scheduler)?;
    let plan = Plan::build(&scheduler, &graph)?;
    scheduler.run()?;

    assert!(plan.wait_awaited(Some(TEST_TIMEOUT)));
    let plan = within_timeout(move || {
        scheduler.close();
        plan
    });

    let report = plan.report();
    assert_eq!(report.completed(), 3);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.task("c").and_then(|t| t.output), Some(3));
    assert_eq!(
        plan.journal().hooks_of("b"),
        vec![HookKind::Initialize, HookKind::Process, HookKind::Uninitialize]
    );
    Ok(())
}

#[test]
fn diamond_sums_both_branches() -> TestResult {
    init_tracing();

    let graph = GraphFileBuilder::new()
        .with_task("root", TaskSpecBuilder::new().build())
        .with_task("left", TaskSpecBuilder::new().after("root").work_ms(10).build())
        .with_task("right", TaskSpecBuilder::new().after("root").build())
        .with_task(
            "join",
            TaskSpecBuilder::new().after("left").after("right").build(),
        )
        .build();

    let scheduler = TaskScheduler::from_config(&graph.scheduler)?;
    let plan = Plan::build(&scheduler, &graph)?;
    scheduler.run()?;

    assert!(plan.wait_awaited(Some(TEST_TIMEOUT)));
    let plan = within_timeout(move || {
        scheduler.close();
        plan
    });

    assert_eq!(plan.journal().output_of("join"), Some(5));
    Ok(())
}

#[test]
fn failing_task_is_reported_and_dependents_continue() -> TestResult {
    init_tracing();

    let graph = GraphFileBuilder::new()
        .with_task("a", TaskSpecBuilder::new().build())
        .with_task(
            "b",
            TaskSpecBuilder::new().after("a").fail(FailPoint::Process).build(),
        )
        .with_task("c", TaskSpecBuilder::new().after("b").build())
        .build();

    let scheduler = TaskScheduler::from_config(&graph.scheduler)?;
    let plan = Plan::build(&scheduler, &graph)?;
    scheduler.run()?;

    assert!(plan.wait_awaited(Some(TEST_TIMEOUT)));
    let plan = within_timeout(move || {
        scheduler.close();
        plan
    });

    let report = plan.report();
    assert_eq!(report.failed(), 1);
    let b = report.task("b").ok_or("missing b")?;
    assert!(b.cancelled);
    assert_eq!(b.output, None);
    assert!(b.error.as_deref().unwrap_or_default().contains("simulated failure"));

    // b never produced an output, so c only counts itself.
    assert_eq!(report.task("c").and_then(|t| t.output), Some(1));
    Ok(())
}

#[test]
fn unstarted_tasks_are_drained_on_close() -> TestResult {
    init_tracing();

    let graph = GraphFileBuilder::new()
        .with_task("go", TaskSpecBuilder::new().build())
        .with_task("held", TaskSpecBuilder::new().start(false).build())
        .with_task("after_held", TaskSpecBuilder::new().after("held").build())
        .build();

    let scheduler = TaskScheduler::from_config(&graph.scheduler)?;
    let plan = Plan::build(&scheduler, &graph)?;
    assert_eq!(plan.started().len(), 2);
    assert_eq!(plan.awaited().len(), 1);
    assert!(plan.awaited()[0].ptr_eq(plan.handle("go").ok_or("missing go")?));
    scheduler.run()?;

    let go = plan.handle("go").ok_or("missing go")?.clone();
    assert!(go.wait_ended_timeout(TEST_TIMEOUT));

    let held = plan.handle("held").ok_or("missing held")?.clone();
    let after_held = plan.handle("after_held").ok_or("missing after_held")?.clone();
    assert!(!after_held.wait_ended_timeout(Duration::from_millis(50)));
    assert_eq!(after_held.state(), TaskState::Wait);

    let plan = within_timeout(move || {
        scheduler.close();
        plan
    });

    assert_eq!(held.state(), TaskState::Ended);
    assert!(held.is_cancelled());
    assert_eq!(after_held.state(), TaskState::Ended);
    let report = plan.report();
    assert_eq!(report.task("held").and_then(|t| t.output), None);
    assert_eq!(report.completed(), 1);
    assert!(!plan.journal().hooks_of("held").contains(&HookKind::Process));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tokio_backend_runs_the_graph() -> TestResult {
    init_tracing();

    let graph = GraphFileBuilder::new()
        .with_scheduler(SchedulerConfig {
            executor: ExecutorKind::Tokio,
            ..SchedulerConfig::default()
        })
        .with_task("a", TaskSpecBuilder::new().work_ms(5).build())
        .with_task("b", TaskSpecBuilder::new().after("a").build())
        .build();

    let scheduler = TaskScheduler::from_config(&graph.scheduler)?;
    let plan = Plan::build(&scheduler, &graph)?;
    scheduler.run()?;

    let plan = with_timeout(tokio::task::spawn_blocking(move || {
        plan.wait_awaited(None);
        scheduler.close();
        plan
    }))
    .await?;

    assert_eq!(plan.journal().output_of("b"), Some(2));
    Ok(())
}

fn cli_args(dir: &TempDir, graph: &str, deadline_ms: Option<u64>) -> Result<CliArgs, Box<dyn Error>> {
    let path = dir.path().join("Taskgraph.toml");
    fs::write(&path, graph)?;
    Ok(CliArgs {
        config: path.to_string_lossy().into_owned(),
        deadline_ms,
        log_level: None,
        dry_run: false,
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_succeeds_for_a_healthy_graph() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let args = cli_args(&dir, "[task.a]\nwork_ms = 5\n\n[task.b]\nafter = [\"a\"]\n", Some(5_000))?;

    with_timeout(taskgraph::run(args)).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_reports_failed_tasks_as_an_error() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let args = cli_args(&dir, "[task.a]\nfail = \"initialize\"\n", Some(5_000))?;

    let err = with_timeout(taskgraph::run(args)).await.unwrap_err();
    assert_eq!(err.to_string(), "1 task(s) failed");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deadline_cancels_long_running_tasks() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let args = cli_args(&dir, "[task.slow]\nwork_ms = 60000\n", Some(20))?;

    // The slow task notices cancellation and returns without failing.
    with_timeout(taskgraph::run(args)).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_without_deadline_finishes_when_a_started_task_waits_on_an_unstarted_one() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let graph = r#"
[task.go]

[task.held]
start = false

[task.after_held]
after = ["held"]
"#;
    let args = cli_args(&dir, graph, None)?;

    with_timeout(taskgraph::run(args)).await?;
    Ok(())
}

#[tokio::test]
async fn dry_run_does_not_start_anything() -> TestResult {
    init_tracing();

    let dir = TempDir::new()?;
    let mut args = cli_args(&dir, "[task.a]\nfail = \"process\"\n", None)?;
    args.dry_run = true;

    taskgraph::run(args).await?;
    Ok(())
}
