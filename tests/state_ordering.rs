use std::collections::BTreeSet;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use proptest::prelude::*;
use taskgraph::exec::ThreadExecutor;
use taskgraph::{HookKind, TaskHandle, TaskScheduler, TaskState};
use taskgraph_test_utils::recording::{HookLog, RecordingTask};
use taskgraph_test_utils::{TEST_TIMEOUT, init_tracing, within_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// Sample `tasks` states until `stop` is set.
fn observe(tasks: Vec<TaskHandle>, stop: Arc<AtomicBool>) -> thread::JoinHandle<Vec<Vec<TaskState>>> {
    thread::spawn(move || {
        let mut seen = vec![Vec::new(); tasks.len()];
        loop {
            let done = stop.load(Ordering::SeqCst);
            for (i, task) in tasks.iter().enumerate() {
                seen[i].push(task.state());
            }
            if done {
                return seen;
            }
            thread::sleep(Duration::from_micros(200));
        }
    })
}

#[test]
fn observed_states_never_move_backwards() -> TestResult {
    init_tracing();

    let log = HookLog::new();
    let scheduler = TaskScheduler::new(ThreadExecutor::default());

    let a = scheduler.add_task(RecordingTask::new("A", &log));
    let b = scheduler.then_task(&[a.clone()], RecordingTask::new("B", &log))?;
    let c = scheduler.then_task(&[a.clone(), b.clone()], RecordingTask::new("C", &log))?;
    let spin = scheduler.add_task(RecordingTask::new("spin", &log).until_cancelled());

    let stop = Arc::new(AtomicBool::new(false));
    let observer = observe(
        vec![a.clone(), b.clone(), c.clone(), spin.clone()],
        Arc::clone(&stop),
    );

    for t in [&a, &b, &c, &spin] {
        t.run();
    }
    scheduler.run()?;
    assert!(c.wait_ended_timeout(TEST_TIMEOUT));

    within_timeout(move || scheduler.close());
    stop.store(true, Ordering::SeqCst);
    let seen = observer.join().map_err(|_| "observer panicked")?;

    for (states, task) in seen.iter().zip([&a, &b, &c, &spin]) {
        assert!(
            states.windows(2).all(|w| w[0] <= w[1]),
            "{} went backwards: {states:?}",
            task.name()
        );
        assert_eq!(states.last(), Some(&TaskState::Ended));
    }
    Ok(())
}

/// One task of a generated graph.
#[derive(Debug, Clone)]
struct NodeSpec {
    deps: BTreeSet<usize>,
    start: bool,
    cancel: bool,
    fail: Option<HookKind>,
}

fn fail_strategy() -> impl Strategy<Value = Option<HookKind>> {
    prop_oneof![
        4 => Just(None),
        1 => Just(Some(HookKind::Initialize)),
        1 => Just(Some(HookKind::Process)),
        1 => Just(Some(HookKind::Uninitialize)),
    ]
}

// Acyclic by construction: task N only depends on tasks 0..N-1.
fn graph_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<NodeSpec>> {
    proptest::collection::vec(
        (
            proptest::collection::vec(any::<usize>(), 0..3),
            any::<bool>(),
            proptest::bool::weighted(0.2),
            fail_strategy(),
        ),
        1..=max_tasks,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (potential, start, cancel, fail))| NodeSpec {
                deps: if i == 0 {
                    BTreeSet::new()
                } else {
                    potential.into_iter().map(|d| d % i).collect()
                },
                start,
                cancel,
                fail,
            })
            .collect()
    })
}

fn build(scheduler: &TaskScheduler, log: &HookLog, specs: &[NodeSpec]) -> Vec<TaskHandle> {
    let mut handles: Vec<TaskHandle> = Vec::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
        let mut task = RecordingTask::new(&format!("t{i}"), log);
        if let Some(hook) = spec.fail {
            task = task.failing_in(hook);
        }
        let deps: Vec<TaskHandle> = spec.deps.iter().map(|&d| handles[d].clone()).collect();
        let handle = scheduler
            .then_task(&deps, task)
            .expect("dependencies are live before the scheduler runs");
        handles.push(handle);
    }
    handles
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn close_always_drains_and_pairs_hooks(specs in graph_strategy(6)) {
        init_tracing();

        let log = HookLog::new();
        let scheduler = TaskScheduler::new(ThreadExecutor::default());
        let handles = build(&scheduler, &log, &specs);

        for (spec, handle) in specs.iter().zip(&handles) {
            if spec.cancel {
                handle.cancel();
            }
            if spec.start {
                handle.run();
            }
        }
        scheduler.run().expect("thread backend starts the control loop");

        within_timeout(move || scheduler.close());

        for (i, (spec, handle)) in specs.iter().zip(&handles).enumerate() {
            let name = format!("t{i}");
            let inits = log.count(&name, HookKind::Initialize);
            let uninits = log.count(&name, HookKind::Uninitialize);

            prop_assert_eq!(handle.state(), TaskState::Ended);
            prop_assert!(inits <= 1);
            prop_assert_eq!(inits, uninits, "{} initialize/uninitialize mismatch", name);
            if log.has(&name, HookKind::Process) {
                prop_assert!(inits == 1);
                prop_assert!(spec.start);
            }
            if spec.cancel {
                prop_assert!(!log.has(&name, HookKind::Process));
            }

            // A dependency is torn down only after its dependents got
            // their initialize call.
            if let Some(init) = log.position(&name, HookKind::Initialize) {
                for dep in &spec.deps {
                    if let Some(dep_down) = log.position(&format!("t{dep}"), HookKind::Uninitialize) {
                        prop_assert!(init < dep_down, "t{} torn down before {} initialized", dep, name);
                    }
                }
            }
        }
    }
}
