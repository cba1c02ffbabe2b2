//! Identifier types for scopes and frames.
//!
//! Identifiers are allocated from process-wide counters and are never reused,
//! so a closed scope can never be confused with the one that replaced it.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static SCOPE_COUNTER: AtomicU64 = AtomicU64::new(1);
static FRAME_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies one invocation of a scope (one hook run, one test body run).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    /// Allocates a fresh scope ID.
    #[must_use]
    pub fn next() -> Self {
        Self(SCOPE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Creates a scope ID for testing purposes.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeId({})", self.0)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Identifies a declaration site: one `before_all`/`before_each` call.
///
/// A frame outlives the scopes it creates; every invocation of the hook gets
/// a new [`ScopeId`] under the same `FrameId`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(u64);

impl FrameId {
    /// Allocates a fresh frame ID.
    #[must_use]
    pub fn next() -> Self {
        Self(FRAME_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({})", self.0)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}
