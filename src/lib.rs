//! Teardown scopes: register cleanup where the resource is created.
//!
//! # Overview
//!
//! A setup hook or test body that creates something needing cleanup registers
//! the cleanup on the spot with [`teardown`]. The callback is attached to the
//! scope of whatever is currently running and runs when that scope ends:
//!
//! - a run-once-before-group hook's cleanups run after the group's last test;
//! - a run-before-each-test hook's cleanups run right after each test;
//! - a test's own cleanups run as soon as its body finishes, pass or fail.
//!
//! Within a scope cleanups run last-registered-first, one at a time, each
//! awaited before the next. Scopes nest the way groups do: inner scopes drain
//! before the outer ones.
//!
//! # Core Guarantees
//!
//! - **Attribution**: a cleanup belongs to exactly the scope that was current
//!   when it was registered
//! - **Exactly once**: every registered cleanup runs once, even if the body or
//!   an earlier cleanup failed
//! - **Freshness**: every hook invocation starts with an empty list
//! - **Loud misuse**: registering with no live scope is an error, never a
//!   silent no-op
//!
//! # Module Structure
//!
//! - [`cx`]: registration API and the thread-local scope register
//! - [`record`]: scope records and cleanup lists
//! - [`intercept`]: hook interception and test-body wrapping
//! - [`host`]: the lifecycle surface consumed from a test runner
//! - [`lab`]: in-crate test runner used to exercise everything end to end
//! - [`config`]: scope policy configuration
//! - [`error`]: error types
//! - [`types`]: identifiers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::future_not_send)]

pub mod config;
pub mod cx;
pub mod error;
pub mod host;
pub mod intercept;
pub mod lab;
pub mod record;
pub mod test_utils;
pub mod types;

// Re-exports for convenient access to core types
pub use config::{ConfigError, TeardownConfig, TestScopePolicy};
pub use cx::{teardown, teardown_async, try_teardown, try_teardown_async};
pub use error::{
    BoxError, CleanupError, Failure, PanicPayload, ScopeError, ScopeErrorReason, TestResult,
    SCOPE_ERROR_MESSAGE,
};
pub use host::{Focus, Host, TestDecl};
pub use intercept::Scoped;
pub use lab::{Journal, LabConfig, Report, Suite, TestStatus};
pub use types::{FrameId, ScopeId};
