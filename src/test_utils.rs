//! Test utilities.
//!
//! - Tracing-based logging initialization shared by every test
//! - Phase and assertion macros for readable test output
//! - [`ManualTask`], a task whose runs are settled by the test itself
//!
//! # Example
//! ```
//! use deferred::test_utils::{ManualTask, init_test_logging};
//! use futures_lite::future::{block_on, yield_now, zip};
//!
//! init_test_logging();
//! let manual = ManualTask::<u32>::new();
//! let run = manual.task().execute();
//! let (outcome, ()) = block_on(zip(run, async {
//!     yield_now().await;
//!     manual.succeed(7);
//! }));
//! assert_eq!(outcome, Ok(7));
//! ```

use std::sync::{Arc, Once};

use parking_lot::Mutex;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::failure::IntoFailures;
use crate::task::{Fail, Succeed, Task};

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
}

/// Assert a condition, logging the expected and actual values first.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

type Reporters<T> = (Fail, Succeed<T>);

/// A task whose runs stay pending until the test settles them.
///
/// Every run records its reporters. [`succeed`](Self::succeed) and
/// [`fail`](Self::fail) report into the most recent run, which lets a test
/// choose the order in which concurrent branches complete.
pub struct ManualTask<T> {
    runs: Arc<Mutex<Vec<Reporters<T>>>>,
}

impl<T> Clone for ManualTask<T> {
    fn clone(&self) -> Self {
        Self {
            runs: Arc::clone(&self.runs),
        }
    }
}

impl<T: Send + 'static> Default for ManualTask<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> ManualTask<T> {
    /// Creates a manual task with no runs yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a task whose computation records its reporters and returns.
    pub fn task(&self) -> Task<T> {
        let runs = Arc::clone(&self.runs);
        Task::new(move |fail, succeed| runs.lock().push((fail, succeed)))
    }

    /// Number of runs started so far.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs.lock().len()
    }

    /// Settles the latest run with `value`.
    ///
    /// Returns false when no run started yet or the run already settled.
    pub fn succeed(&self, value: T) -> bool {
        self.latest().is_some_and(|(_, succeed)| succeed.report(value))
    }

    /// Settles the latest run with `failure`.
    ///
    /// Returns false when no run started yet or the run already settled.
    pub fn fail(&self, failure: impl IntoFailures) -> bool {
        self.latest().is_some_and(|(fail, _)| fail.report(failure))
    }

    fn latest(&self) -> Option<Reporters<T>> {
        self.runs.lock().last().cloned()
    }
}
