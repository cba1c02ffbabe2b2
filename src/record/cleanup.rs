//! Cleanup callbacks and the per-scope cleanup list.
//!
//! Cleanups are registered while a scope runs and drained when it ends. A
//! drain takes the whole list in one step, then runs the callbacks in reverse
//! registration order, one at a time, awaiting each before starting the next.
//! A later registration may depend on state an earlier one has not torn down
//! yet, so sibling cleanups never run concurrently.
//!
//! A failing or panicking callback does not stop the drain: every callback
//! that was taken runs to completion and every failure is recorded in the
//! [`DrainReport`].

use crate::error::{BoxError, CleanupError, PanicPayload};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Outcome of a single cleanup callback.
pub type CleanupResult = Result<(), BoxError>;

/// A deferred action registered against a scope.
pub enum Cleanup {
    /// Synchronous callback, run directly on the draining task.
    Sync(Box<dyn FnOnce() -> CleanupResult>),

    /// Asynchronous callback; the future is created and awaited at drain time.
    Async(Box<dyn FnOnce() -> LocalBoxFuture<'static, CleanupResult>>),
}

impl std::fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => f.debug_tuple("Sync").field(&"<closure>").finish(),
            Self::Async(_) => f.debug_tuple("Async").field(&"<future>").finish(),
        }
    }
}

impl Cleanup {
    /// Wraps an infallible synchronous closure.
    pub fn sync<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self::Sync(Box::new(move || {
            f();
            Ok(())
        }))
    }

    /// Wraps a fallible synchronous closure.
    pub fn try_sync<F, E>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), E> + 'static,
        E: Into<BoxError>,
    {
        Self::Sync(Box::new(move || f().map_err(Into::into)))
    }

    /// Wraps a closure producing an infallible future.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Self::Async(Box::new(move || {
            let fut = f();
            async move {
                fut.await;
                Ok(())
            }
            .boxed_local()
        }))
    }

    /// Wraps a closure producing a fallible future.
    pub fn try_future<F, Fut, E>(f: F) -> Self
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = Result<(), E>> + 'static,
        E: Into<BoxError>,
    {
        Self::Async(Box::new(move || {
            let fut = f();
            async move { fut.await.map_err(Into::into) }.boxed_local()
        }))
    }

    /// Runs the callback, converting errors and panics into [`CleanupError`].
    ///
    /// `position` is the callback's registration index, used for reporting.
    pub async fn run(self, position: usize) -> Result<(), CleanupError> {
        let outcome = match self {
            Self::Sync(f) => std::panic::catch_unwind(AssertUnwindSafe(f)),
            Self::Async(f) => match std::panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
                Err(payload) => Err(payload),
            },
        };
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(CleanupError::Failed { position, source }),
            Err(payload) => Err(CleanupError::Panicked {
                position,
                payload: PanicPayload::from_any(payload.as_ref()),
            }),
        }
    }
}

/// Ordered list of pending cleanups, owned by exactly one scope.
#[derive(Debug, Default)]
pub struct CleanupList {
    cleanups: Vec<Cleanup>,
}

impl CleanupList {
    /// Creates a new empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a cleanup; insertion order is registration order.
    pub fn push(&mut self, cleanup: Cleanup) {
        self.cleanups.push(cleanup);
    }

    /// Returns the number of pending cleanups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cleanups.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cleanups.is_empty()
    }

    /// Takes every pending cleanup and leaves the list empty.
    ///
    /// Whatever is returned here can never be handed out again, which is what
    /// keeps a second drain from re-running a callback.
    #[must_use]
    pub fn take_all(&mut self) -> Vec<Cleanup> {
        std::mem::take(&mut self.cleanups)
    }
}

/// What a drain did.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Number of callbacks that were run (failed ones included).
    pub ran: usize,
    /// Every failure, in the order the callbacks ran.
    pub errors: Vec<CleanupError>,
}

impl DrainReport {
    /// Returns true if every callback succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Surfaces the first failure, or the number of callbacks run.
    pub fn into_result(self) -> Result<usize, CleanupError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.ran),
        }
    }
}

/// Runs `cleanups` in reverse order, sequentially, awaiting each.
///
/// Failures are recorded and the drain continues with the next callback.
pub async fn drain(cleanups: Vec<Cleanup>) -> DrainReport {
    let mut report = DrainReport::default();
    for (position, cleanup) in cleanups.into_iter().enumerate().rev() {
        let result = cleanup.run(position).await;
        report.ran += 1;
        if let Err(err) = result {
            tracing::warn!(position, error = %err, "cleanup failed; continuing drain");
            report.errors.push(err);
        }
    }
    report
}
