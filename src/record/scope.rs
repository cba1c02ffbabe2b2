//! Scope record: one invocation of a hook or test body.
//!
//! A scope owns the cleanup list for a single run. Declaration sites are
//! tracked separately (see [`crate::intercept::ScopeFrame`]); every run of a
//! declaration gets a brand-new record, so no list is ever shared between two
//! executions.

use crate::error::{ScopeError, ScopeErrorReason};
use crate::record::cleanup::{Cleanup, CleanupList};
use crate::types::ScopeId;
use std::cell::RefCell;
use std::rc::Rc;

/// The state of a scope in its lifecycle.
///
/// State machine:
/// ```text
/// Idle → Installed → Running → Draining → Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// Allocated, not yet visible to registration.
    Idle,
    /// Placed into the scope register; the body has not started yet.
    Installed,
    /// The hook or test body is executing; registrations are accepted.
    Running,
    /// Cleanups have been taken and are being run.
    Draining,
    /// Terminal: every cleanup ran exactly once.
    Closed,
}

impl ScopeState {
    /// Returns true if registrations are accepted in this state.
    #[must_use]
    pub const fn accepts_cleanups(self) -> bool {
        matches!(self, Self::Installed | Self::Running)
    }

    /// Returns true if the scope is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns true if `next` is the legal successor of this state.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Installed)
                | (Self::Installed, Self::Running)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Closed)
        )
    }
}

/// Which lifecycle construct a scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// A run-once-before-group hook; drained after the group's last test.
    Group,
    /// A run-before-each-test hook; drained after each test.
    Each,
    /// A test body with its own private list.
    Test,
}

impl ScopeKind {
    /// Short label used in log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Group => "before_all",
            Self::Each => "before_each",
            Self::Test => "test",
        }
    }
}

/// Shared handle to a live scope record.
pub type ScopeHandle = Rc<RefCell<ScopeRecord>>;

/// Internal record for one scope invocation.
#[derive(Debug)]
pub struct ScopeRecord {
    id: ScopeId,
    kind: ScopeKind,
    state: ScopeState,
    cleanups: CleanupList,
}

impl ScopeRecord {
    /// Creates a new idle record with an empty list.
    #[must_use]
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            id: ScopeId::next(),
            kind,
            state: ScopeState::Idle,
            cleanups: CleanupList::new(),
        }
    }

    /// Creates a new idle record wrapped in a shared handle.
    #[must_use]
    pub fn new_handle(kind: ScopeKind) -> ScopeHandle {
        Rc::new(RefCell::new(Self::new(kind)))
    }

    /// Returns the scope ID.
    #[must_use]
    pub const fn id(&self) -> ScopeId {
        self.id
    }

    /// Returns the scope kind.
    #[must_use]
    pub const fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> ScopeState {
        self.state
    }

    /// Returns the number of pending cleanups.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.cleanups.len()
    }

    /// Appends a cleanup if the scope is still live.
    pub fn register(&mut self, cleanup: Cleanup) -> Result<(), ScopeError> {
        if !self.state.accepts_cleanups() {
            return Err(ScopeError::new(ScopeErrorReason::Closed));
        }
        self.cleanups.push(cleanup);
        Ok(())
    }

    /// Moves to `next`, ignoring (and logging) an illegal transition.
    ///
    /// Returns whether the transition happened.
    pub fn advance(&mut self, next: ScopeState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            tracing::warn!(
                scope = %self.id,
                kind = self.kind.as_str(),
                from = ?self.state,
                to = ?next,
                "ignoring illegal scope transition"
            );
            false
        }
    }

    /// Enters `Draining` and takes every pending cleanup.
    ///
    /// Returns nothing if the scope was not running, so a repeated drain is a
    /// no-op.
    #[must_use]
    pub fn begin_drain(&mut self) -> Vec<Cleanup> {
        if self.advance(ScopeState::Draining) {
            self.cleanups.take_all()
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_happy_path() {
        let mut scope = ScopeRecord::new(ScopeKind::Each);
        assert_eq!(scope.state(), ScopeState::Idle);
        assert!(scope.register(Cleanup::sync(|| {})).is_err());

        assert!(scope.advance(ScopeState::Installed));
        scope.register(Cleanup::sync(|| {})).unwrap();
        assert!(scope.advance(ScopeState::Running));
        scope.register(Cleanup::sync(|| {})).unwrap();
        assert_eq!(scope.pending(), 2);

        let taken = scope.begin_drain();
        assert_eq!(taken.len(), 2);
        assert_eq!(scope.state(), ScopeState::Draining);
        assert_eq!(
            scope.register(Cleanup::sync(|| {})).unwrap_err().reason(),
            ScopeErrorReason::Closed
        );

        assert!(scope.advance(ScopeState::Closed));
        assert!(scope.state().is_terminal());
    }

    #[test]
    fn closed_is_final() {
        let mut scope = ScopeRecord::new(ScopeKind::Group);
        scope.advance(ScopeState::Installed);
        scope.advance(ScopeState::Running);
        let _ = scope.begin_drain();
        scope.advance(ScopeState::Closed);

        assert!(!scope.advance(ScopeState::Installed));
        assert!(!scope.advance(ScopeState::Running));
        assert!(scope.begin_drain().is_empty());
        assert_eq!(scope.state(), ScopeState::Closed);
    }

    #[test]
    fn transitions_cannot_skip_states() {
        assert!(!ScopeState::Idle.can_transition_to(ScopeState::Running));
        assert!(!ScopeState::Installed.can_transition_to(ScopeState::Closed));
        assert!(!ScopeState::Running.can_transition_to(ScopeState::Installed));
        assert!(ScopeState::Running.accepts_cleanups());
        assert!(!ScopeState::Draining.accepts_cleanups());
    }

    #[test]
    fn records_get_distinct_ids() {
        let a = ScopeRecord::new(ScopeKind::Test);
        let b = ScopeRecord::new(ScopeKind::Test);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.kind().as_str(), "test");
    }
}
