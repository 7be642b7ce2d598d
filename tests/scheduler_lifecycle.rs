use std::error::Error;
use std::sync::{Arc, Mutex};

use taskgraph::exec::ThreadExecutor;
use taskgraph::{TaskGraphError, TaskHandle, TaskScheduler, TaskState};
use taskgraph_test_utils::executor::CountingExecutor;
use taskgraph_test_utils::recording::{HookLog, RecordingTask};
use taskgraph_test_utils::{TEST_TIMEOUT, eventually, init_tracing, within_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn noop_task_reaches_ended_and_close_returns() -> TestResult {
    init_tracing();

    let scheduler = TaskScheduler::new(ThreadExecutor::default());
    let task = scheduler.add_func(|_| Ok(()));
    task.run();
    scheduler.run()?;

    assert!(task.wait_ended_timeout(TEST_TIMEOUT), "task never ended");
    within_timeout(move || scheduler.close());

    assert_eq!(task.state(), TaskState::Ended);
    assert!(!task.has_error());
    assert!(!task.is_cancelled());
    Ok(())
}

#[test]
fn close_on_empty_scheduler_invokes_no_hooks() -> TestResult {
    init_tracing();

    let log = HookLog::new();
    let scheduler = TaskScheduler::new(ThreadExecutor::default());
    scheduler.run()?;

    let scheduler = within_timeout(move || {
        scheduler.close();
        scheduler
    });

    assert!(log.is_empty());
    assert!(scheduler.is_empty());
    assert!(!scheduler.is_running());
    assert!(!scheduler.is_closing());
    Ok(())
}

#[test]
fn close_before_run_is_a_noop() {
    init_tracing();

    let log = HookLog::new();
    let scheduler = TaskScheduler::new(ThreadExecutor::default());
    let task = scheduler.add_task(RecordingTask::new("idle", &log));

    scheduler.close();

    assert_eq!(scheduler.len(), 1);
    assert_eq!(task.state(), TaskState::Created);
    assert!(!task.is_cancelled());
    assert!(log.is_empty());
}

#[test]
fn run_twice_starts_one_control_loop() -> TestResult {
    init_tracing();

    let executor = CountingExecutor::new();
    let scheduler = TaskScheduler::new(executor.clone());

    scheduler.run()?;
    scheduler.run()?;

    assert_eq!(executor.started(), 1);
    assert!(scheduler.is_running());

    within_timeout(move || scheduler.close());
    Ok(())
}

#[test]
fn run_reports_backend_failure() -> TestResult {
    init_tracing();

    let executor = CountingExecutor::new();
    executor.refuse_new_jobs(true);
    let scheduler = TaskScheduler::new(executor.clone());

    match scheduler.run() {
        Err(TaskGraphError::Executor(msg)) => assert!(msg.contains("refused")),
        other => panic!("expected executor error, got {other:?}"),
    }
    assert!(!scheduler.is_running());

    executor.refuse_new_jobs(false);
    scheduler.run()?;
    assert!(scheduler.is_running());

    within_timeout(move || scheduler.close());
    Ok(())
}

#[test]
fn scheduler_is_reusable_after_close() -> TestResult {
    init_tracing();

    let scheduler = TaskScheduler::new(ThreadExecutor::default());
    scheduler.run()?;
    let first = scheduler.add_func(|_| Ok(()));
    first.run();
    assert!(first.wait_ended_timeout(TEST_TIMEOUT));

    let scheduler = within_timeout(move || {
        scheduler.close();
        scheduler
    });
    assert!(!scheduler.is_running());

    let second = scheduler.add_func(|_| Ok(()));
    second.run();
    scheduler.run()?;
    assert!(second.wait_ended_timeout(TEST_TIMEOUT));
    assert!(!second.has_error());

    within_timeout(move || scheduler.close());
    Ok(())
}

#[test]
fn tasks_can_add_follow_up_work_from_process() -> TestResult {
    init_tracing();

    let follow_up: Arc<Mutex<Option<TaskHandle>>> = Arc::new(Mutex::new(None));
    let scheduler = TaskScheduler::new(ThreadExecutor::default());

    let slot = Arc::clone(&follow_up);
    let first = scheduler.add_func(move |cx| {
        let next = cx.scheduler().add_func(|_| Ok(()));
        next.run();
        *slot.lock().unwrap() = Some(next);
        Ok(())
    });
    first.run();
    scheduler.run()?;

    assert!(first.wait_ended_timeout(TEST_TIMEOUT));
    assert!(eventually(|| follow_up.lock().unwrap().is_some()));
    let next = follow_up.lock().unwrap().clone().unwrap();
    assert!(next.wait_ended_timeout(TEST_TIMEOUT));
    assert!(!next.is_cancelled());

    within_timeout(move || scheduler.close());
    Ok(())
}

#[test]
fn dropping_scheduler_drains_running_tasks() -> TestResult {
    init_tracing();

    let log = HookLog::new();
    let scheduler = TaskScheduler::new(ThreadExecutor::default());
    let task = scheduler.add_task(RecordingTask::new("spinner", &log).until_cancelled());
    task.run();
    scheduler.run()?;

    assert!(eventually(|| task.state() == TaskState::Executing));
    within_timeout(move || drop(scheduler));

    assert_eq!(task.state(), TaskState::Ended);
    assert!(task.is_cancelled());
    assert_eq!(log.count("spinner", taskgraph::HookKind::Uninitialize), 1);
    Ok(())
}
