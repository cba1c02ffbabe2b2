//! Registration API and the scope register behind it.
//!
//! Test code calls [`teardown`] (or one of its variants) from a setup hook or
//! a test body. The callback is appended to whichever scope is current on the
//! thread and runs when that scope drains.
//!
//! ```ignore
//! use teardown_scope::cx::teardown;
//!
//! let server = start_server();
//! let handle = server.clone();
//! teardown(move || handle.stop())?;
//! ```
//!
//! Calling any of these with no live scope (at module level, after the scope
//! drained, or from a concurrently running test body) returns a
//! [`ScopeError`] and registers nothing.
//!
//! # Module Contents
//!
//! - [`register`]: the thread-local scope register

pub mod register;

use crate::error::{BoxError, ScopeError};
use crate::record::Cleanup;
use std::future::Future;

pub use register::{current, detach, install, restore, DetachGuard};

/// Registers a cleanup to run when the current scope ends.
pub fn teardown<F>(f: F) -> Result<(), ScopeError>
where
    F: FnOnce() + 'static,
{
    register::register(Cleanup::sync(f))
}

/// Registers a fallible cleanup; its error fails the enclosing scope.
pub fn try_teardown<F, E>(f: F) -> Result<(), ScopeError>
where
    F: FnOnce() -> Result<(), E> + 'static,
    E: Into<BoxError>,
{
    register::register(Cleanup::try_sync(f))
}

/// Registers an async cleanup; the drain awaits it before moving on.
pub fn teardown_async<F, Fut>(f: F) -> Result<(), ScopeError>
where
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    register::register(Cleanup::future(f))
}

/// Registers a fallible async cleanup.
pub fn try_teardown_async<F, Fut, E>(f: F) -> Result<(), ScopeError>
where
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = Result<(), E>> + 'static,
    E: Into<BoxError>,
{
    register::register(Cleanup::try_future(f))
}

/// Returns true if a registration made now would succeed.
#[must_use]
pub fn is_active() -> bool {
    current().is_some_and(|scope| scope.borrow().state().accepts_cleanups())
}
