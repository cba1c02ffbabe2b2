//! Internal records for scopes and their cleanup lists.
//!
//! These types hold the per-invocation state; the register that makes a
//! record "current" lives in [`crate::cx`].

pub mod cleanup;
pub mod scope;

pub use cleanup::{drain, Cleanup, CleanupList, CleanupResult, DrainReport};
pub use scope::{ScopeHandle, ScopeKind, ScopeRecord, ScopeState};
