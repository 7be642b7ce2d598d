pub mod builders;
pub mod executor;
pub mod recording;

use std::sync::Once;
use std::time::{Duration, Instant};

use taskgraph::logging::{LOG_ENV_VAR, build_filter};
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Install a test-captured subscriber once per test binary.
///
/// Output only shows for failing tests unless run with `--nocapture`.
/// Uses the same `TASKGRAPH_LOG` directives as the binary, e.g.
/// `TASKGRAPH_LOG=taskgraph::scheduler=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let env = std::env::var(LOG_ENV_VAR).ok();
        let filter = build_filter(None, env.as_deref()).unwrap_or_else(|_| EnvFilter::new("info"));

        // Another harness may have installed one already.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .try_init();
    });
}

/// Default upper bound for anything a test waits on.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll `cond` until it holds or [`TEST_TIMEOUT`] elapses.
///
/// Returns whether the condition was met.
pub fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TEST_TIMEOUT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Run a blocking closure on its own thread and panic if it does not
/// return within [`TEST_TIMEOUT`].
///
/// Used around `close()` so a drain that hangs fails the test instead of
/// blocking the test binary.
pub fn within_timeout<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(TEST_TIMEOUT)
        .expect("Test timed out after 5 seconds")
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .expect("Test timed out after 5 seconds")
}
