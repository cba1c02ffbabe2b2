//! Results collected by the lab host.

use crate::error::Failure;
use core::fmt;
use std::sync::Arc;

/// Final status of one test.
#[derive(Debug, Clone)]
pub enum TestStatus {
    /// The test passed (or, if expected to fail, failed as expected).
    Passed,
    /// The test failed.
    Failed(Arc<Failure>),
    /// The test was skipped, filtered out by focus, or never reached.
    Skipped,
    /// Placeholder test.
    Todo,
}

impl TestStatus {
    /// Returns true for [`TestStatus::Passed`].
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Returns true for [`TestStatus::Failed`].
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed(failure) => write!(f, "failed: {failure}"),
            Self::Skipped => f.write_str("skipped"),
            Self::Todo => f.write_str("todo"),
        }
    }
}

/// Result of one test, keyed by its full name.
#[derive(Debug, Clone)]
pub struct TestRecord {
    /// Group names and test name joined with `" > "`.
    pub name: String,
    /// Final status.
    pub status: TestStatus,
}

/// Group-level hook that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupHook {
    /// A run-once-before-group hook.
    BeforeAll,
    /// A run-once-after-group hook (including synthesized drains).
    AfterAll,
}

/// A group-level hook failure.
#[derive(Debug, Clone)]
pub struct HookFailure {
    /// Full name of the group.
    pub group: String,
    /// Which hook failed.
    pub hook: GroupHook,
    /// What went wrong.
    pub failure: Arc<Failure>,
}

/// Everything a suite run produced.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Tests in completion order.
    pub tests: Vec<TestRecord>,
    /// Group-level hook failures in the order they happened.
    pub hook_failures: Vec<HookFailure>,
}

impl Report {
    pub(crate) fn record(&mut self, name: String, status: TestStatus) {
        match &status {
            TestStatus::Failed(failure) => {
                tracing::info!(test = %name, error = %failure, "test failed");
            }
            other => tracing::info!(test = %name, status = %other, "test finished"),
        }
        self.tests.push(TestRecord { name, status });
    }

    pub(crate) fn record_hook_failure(&mut self, group: String, hook: GroupHook, failure: Arc<Failure>) {
        tracing::warn!(group = %group, hook = ?hook, error = %failure, "group hook failed");
        self.hook_failures.push(HookFailure {
            group,
            hook,
            failure,
        });
    }

    /// Returns the status of the test with the given full name.
    #[must_use]
    pub fn status(&self, name: &str) -> Option<&TestStatus> {
        self.tests
            .iter()
            .find(|record| record.name == name)
            .map(|record| &record.status)
    }

    /// Number of passed tests.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.tests.iter().filter(|r| r.status.is_passed()).count()
    }

    /// Number of failed tests.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.tests.iter().filter(|r| r.status.is_failed()).count()
    }

    /// Number of skipped tests.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.tests
            .iter()
            .filter(|r| matches!(r.status, TestStatus::Skipped))
            .count()
    }

    /// Number of todo tests.
    #[must_use]
    pub fn todo(&self) -> usize {
        self.tests
            .iter()
            .filter(|r| matches!(r.status, TestStatus::Todo))
            .count()
    }

    /// Returns true if no test and no group hook failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.hook_failures.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.tests {
            writeln!(f, "{}: {}", record.name, record.status)?;
        }
        for failure in &self.hook_failures {
            writeln!(f, "{} ({:?}): {}", failure.group, failure.hook, failure.failure)?;
        }
        write!(
            f,
            "{} passed, {} failed, {} skipped, {} todo",
            self.passed(),
            self.failed(),
            self.skipped(),
            self.todo()
        )
    }
}
