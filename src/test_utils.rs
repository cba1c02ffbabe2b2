//! Test utilities for teardown scopes.
//!
//! This module provides shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - A lock for tests that mutate environment variables
//! - A shortcut for building and running an intercepted suite
//!
//! # Example
//! ```ignore
//! use teardown_scope::test_utils::{init_test_logging, run_scoped};
//!
//! let report = run_scoped(|s| {
//!     s.test("works", || async {});
//! });
//! assert!(report.is_success());
//! ```

use crate::intercept::Scoped;
use crate::lab::{Report, Suite};
use std::sync::{Mutex, MutexGuard, Once, PoisonError};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: Mutex<()> = Mutex::new(());

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
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Declares a suite through [`Scoped`] and runs it on the current thread.
pub fn run_scoped<F>(declare: F) -> Report
where
    F: FnOnce(&mut Scoped<'_, Suite>),
{
    init_test_logging();
    let mut suite = Suite::new();
    declare(&mut Scoped::new(&mut suite));
    suite.run()
}
