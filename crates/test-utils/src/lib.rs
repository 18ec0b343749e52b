//! Shared fixtures for the `scriptwatch` integration tests.
//!
//! - [`RecordingInterpreter`] records every run and termination.
//! - [`EnvironmentHarness`] runs an environment over an in-memory
//!   filesystem with hand-fed change events.

pub mod harness;
pub mod recording;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

pub use harness::{EnvironmentHarness, ROOT};
pub use recording::RecordingInterpreter;

static INIT: Once = Once::new();

/// How long [`with_timeout`] lets an async test wait.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once per test binary.
///
/// Filter comes from `SCRIPTWATCH_LOG`, then `RUST_LOG`, then `info`.
/// Output is only shown for failing tests unless run with `--nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(scriptwatch::logging::LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        // Another subscriber may already be installed by the test binary.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, failing the test after [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test timed out after {TEST_TIMEOUT:?}"))
}
