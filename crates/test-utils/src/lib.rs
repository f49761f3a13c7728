//! Shared helpers for console-runner's integration tests.

pub mod builders;
pub mod fake_launcher;

use std::future::Future;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use console_runner::exec::LaunchSpec;
use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Specs recorded by a [`fake_launcher::ScriptedLauncher`], in start order.
pub type StartedSpecs = Arc<Mutex<Vec<LaunchSpec>>>;

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Output only shows for failing tests (or with `--nocapture`); pick levels
/// with e.g. `RUST_LOG=console_runner::exec=trace`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test step timed out after {TEST_TIMEOUT:?}"),
    }
}
