//! The scope register: which cleanup list is current on this thread.
//!
//! The register is a stack of slots. Entering a scope pushes its handle;
//! leaving it removes that handle again, which restores whatever the
//! enclosing scope had installed. Only the top slot is ever current.
//!
//! The stack is thread-local. Hook and test bodies are cooperative: at most
//! one body is active at any suspension point, so the top slot always belongs
//! to the body that is running. Bodies that the host runs truly concurrently
//! cannot be attributed to any single slot; while they run, the host pushes a
//! detached slot (see [`detach`]) and registration fails.

use crate::error::{ScopeError, ScopeErrorReason};
use crate::record::{Cleanup, ScopeHandle};
use crate::types::ScopeId;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

enum Slot {
    Scope(ScopeId, ScopeHandle),
    Detached(u64),
}

thread_local! {
    static REGISTER: RefCell<Vec<Slot>> = const { RefCell::new(Vec::new()) };
    static DETACH_TOKENS: Cell<u64> = const { Cell::new(0) };
}

/// Makes `handle` the current scope on this thread.
pub fn install(handle: &ScopeHandle) {
    let id = handle.borrow().id();
    REGISTER.with(|reg| {
        let mut reg = reg.borrow_mut();
        reg.push(Slot::Scope(id, Rc::clone(handle)));
        tracing::trace!(scope = %id, depth = reg.len(), "scope installed");
    });
}

/// Removes the slot installed for `id`.
///
/// The slot is expected on top. If a host tore scopes down out of order the
/// slot is still removed from wherever it sits, and the violation is logged.
/// Returns false if `id` was not installed at all.
pub fn restore(id: ScopeId) -> bool {
    REGISTER.with(|reg| {
        let mut reg = reg.borrow_mut();
        let Some(index) = reg
            .iter()
            .rposition(|slot| matches!(slot, Slot::Scope(sid, _) if *sid == id))
        else {
            return false;
        };
        if index + 1 != reg.len() {
            tracing::warn!(
                scope = %id,
                depth = reg.len(),
                position = index,
                "scope restored out of nesting order"
            );
        }
        reg.remove(index);
        tracing::trace!(scope = %id, depth = reg.len(), "scope restored");
        true
    })
}

/// Returns the current scope, if one is installed and not masked.
#[must_use]
pub fn current() -> Option<ScopeHandle> {
    REGISTER.with(|reg| match reg.borrow().last() {
        Some(Slot::Scope(_, handle)) => Some(Rc::clone(handle)),
        _ => None,
    })
}

/// Returns the number of slots on this thread's register.
#[must_use]
pub fn depth() -> usize {
    REGISTER.with(|reg| reg.borrow().len())
}

/// Appends `cleanup` to the current scope.
///
/// On error nothing is registered and `cleanup` is dropped unrun.
pub fn register(cleanup: Cleanup) -> Result<(), ScopeError> {
    REGISTER.with(|reg| match reg.borrow().last() {
        None => Err(ScopeError::new(ScopeErrorReason::NoScope)),
        Some(Slot::Detached(_)) => Err(ScopeError::new(ScopeErrorReason::Concurrent)),
        Some(Slot::Scope(_, handle)) => handle.borrow_mut().register(cleanup),
    })
}

/// Masks the register while test bodies run concurrently.
///
/// Until the guard drops, [`current`] is empty and registration fails with
/// [`ScopeErrorReason::Concurrent`].
#[must_use]
pub fn detach() -> DetachGuard {
    let token = DETACH_TOKENS.with(|tokens| {
        let next = tokens.get() + 1;
        tokens.set(next);
        next
    });
    REGISTER.with(|reg| reg.borrow_mut().push(Slot::Detached(token)));
    DetachGuard {
        token,
        _not_send: PhantomData,
    }
}

/// Guard returned by [`detach`].
#[derive(Debug)]
pub struct DetachGuard {
    token: u64,
    _not_send: PhantomData<Rc<()>>,
}

impl Drop for DetachGuard {
    fn drop(&mut self) {
        let token = self.token;
        REGISTER.with(|reg| {
            let mut reg = reg.borrow_mut();
            if let Some(index) = reg
                .iter()
                .rposition(|slot| matches!(slot, Slot::Detached(t) if *t == token))
            {
                reg.remove(index);
            }
        });
    }
}
