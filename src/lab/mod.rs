//! In-crate host for exercising scopes end to end.
//!
//! The lab host provides:
//!
//! - A declaration tree ([`Suite`]) implementing [`Host`](crate::host::Host)
//! - Single-threaded execution with the ordering guarantees scopes rely on
//! - Per-test results ([`Report`])
//! - Small helpers for observing execution order ([`Journal`], [`yield_now`])

pub mod config;
pub mod report;
mod runner;
pub mod suite;

pub use config::LabConfig;
pub use report::{GroupHook, HookFailure, Report, TestRecord, TestStatus};
pub use suite::Suite;

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Future returned by [`yield_now`].
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// Returns `Pending` once, forcing a real suspension point.
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Shared, append-only log of what ran, in order.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line.
    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(line = %line, "journal");
        self.lines.lock().push(line);
    }

    /// Returns a copy of every line so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Removes and returns every line so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn yield_now_suspends_once() {
        let journal = Journal::new();
        let a = journal.clone();
        let b = journal.clone();
        block_on(futures::future::join(
            async move {
                a.log("a1");
                yield_now().await;
                a.log("a2");
            },
            async move {
                b.log("b1");
            },
        ));
        assert_eq!(journal.take(), vec!["a1", "b1", "a2"]);
        assert!(journal.lines().is_empty());
    }
}
