//! Error types for teardown registration and scope draining.
//!
//! Error handling follows these principles:
//!
//! - Registration outside a live scope is a [`ScopeError`], surfaced
//!   synchronously to the caller and never swallowed.
//! - A cleanup callback that fails or panics is a [`CleanupError`]; the drain
//!   keeps going and the first error is reported for the enclosing scope.
//! - Everything that can fail a hook or a test body is folded into
//!   [`Failure`], which is what hosts report.
//!
//! Body failures and cleanup failures are independent: neither hides the
//! other. When both happen, [`Failure::Compound`] carries the two together.

use core::fmt;
use std::any::Any;

/// Boxed error returned by user hooks, test bodies and fallible cleanups.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The fixed, user-facing message carried by every [`ScopeError`].
pub const SCOPE_ERROR_MESSAGE: &str = "teardown can only be called from within `before_all`, \
    `before_each`, `test` or `it`. It cannot be called from concurrent tests.";

/// Why a registration was rejected.
///
/// This is diagnostic only: the displayed message is always
/// [`SCOPE_ERROR_MESSAGE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeErrorReason {
    /// No scope is installed on the current thread.
    NoScope,
    /// The register is detached because test bodies are running concurrently.
    Concurrent,
    /// The installed scope is already draining or closed.
    Closed,
}

/// Registration was attempted while no live scope was active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{}", SCOPE_ERROR_MESSAGE)]
pub struct ScopeError {
    reason: ScopeErrorReason,
}

impl ScopeError {
    /// Creates a scope error with the given diagnostic reason.
    #[must_use]
    pub const fn new(reason: ScopeErrorReason) -> Self {
        Self { reason }
    }

    /// Returns the diagnostic reason.
    #[must_use]
    pub const fn reason(&self) -> ScopeErrorReason {
        self.reason
    }
}

/// Payload from a caught panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicPayload {
    message: String,
}

impl PanicPayload {
    /// Creates a new panic payload with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Builds a payload from the value handed back by `catch_unwind`.
    #[must_use]
    pub fn from_any(payload: &(dyn Any + Send)) -> Self {
        if let Some(s) = payload.downcast_ref::<&str>() {
            Self::new(*s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Self::new(s.clone())
        } else {
            Self::new("unknown panic")
        }
    }

    /// Returns the panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic: {}", self.message)
    }
}

/// A cleanup callback failed while its scope was draining.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    /// The callback returned an error.
    #[error("cleanup #{position} failed: {source}")]
    Failed {
        /// Zero-based registration index within the drained list.
        position: usize,
        /// The error returned by the callback.
        #[source]
        source: BoxError,
    },
    /// The callback panicked.
    #[error("cleanup #{position} panicked: {payload}")]
    Panicked {
        /// Zero-based registration index within the drained list.
        position: usize,
        /// The caught panic.
        payload: PanicPayload,
    },
}

impl CleanupError {
    /// Returns the registration index of the failing callback.
    #[must_use]
    pub const fn position(&self) -> usize {
        match self {
            Self::Failed { position, .. } | Self::Panicked { position, .. } => *position,
        }
    }
}

/// Anything that fails a hook or a test body.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    /// The body returned an error.
    #[error("{0}")]
    Error(BoxError),
    /// The body panicked (failed assertion).
    #[error("{0}")]
    Panicked(PanicPayload),
    /// A teardown was registered outside a live scope and the body propagated it.
    #[error(transparent)]
    Scope(#[from] ScopeError),
    /// The body succeeded but draining its scope did not.
    #[error(transparent)]
    Cleanup(#[from] CleanupError),
    /// The body failed and draining its scope failed too.
    #[error("{body} (and {cleanup})")]
    Compound {
        /// The body failure.
        body: Box<Failure>,
        /// The first cleanup failure of the drain that followed.
        cleanup: CleanupError,
    },
}

impl Failure {
    /// Creates a failure from a plain message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Error(message.into())
    }

    /// Combines a body outcome with the outcome of the drain that followed it.
    ///
    /// The body failure, if any, always survives; a cleanup failure is attached
    /// rather than replacing it.
    pub fn combine(
        body: Result<(), Failure>,
        cleanup: Result<(), CleanupError>,
    ) -> Result<(), Failure> {
        match (body, cleanup) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(body), Ok(())) => Err(body),
            (Ok(()), Err(cleanup)) => Err(Self::Cleanup(cleanup)),
            (Err(body), Err(cleanup)) => Err(Self::Compound {
                body: Box::new(body),
                cleanup,
            }),
        }
    }

    /// Returns the cleanup failure carried by this failure, if any.
    #[must_use]
    pub fn cleanup_error(&self) -> Option<&CleanupError> {
        match self {
            Self::Cleanup(err) | Self::Compound { cleanup: err, .. } => Some(err),
            _ => None,
        }
    }

    /// Returns true if the body itself failed, independent of any cleanup.
    #[must_use]
    pub const fn is_body_failure(&self) -> bool {
        !matches!(self, Self::Cleanup(_))
    }

    /// Returns true if this failure is (or wraps) a [`ScopeError`].
    #[must_use]
    pub fn is_scope_error(&self) -> bool {
        match self {
            Self::Scope(_) => true,
            Self::Compound { body, .. } => body.is_scope_error(),
            Self::Error(err) => err.downcast_ref::<ScopeError>().is_some(),
            _ => false,
        }
    }
}

impl From<BoxError> for Failure {
    fn from(err: BoxError) -> Self {
        Self::Error(err)
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self::msg(message)
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

impl From<PanicPayload> for Failure {
    fn from(payload: PanicPayload) -> Self {
        Self::Panicked(payload)
    }
}

/// Result of a hook or test body.
pub type TestResult = Result<(), Failure>;
