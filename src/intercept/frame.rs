//! Scope frames: one per declaration site.
//!
//! A frame pairs the trigger that installs a fresh scope with the trigger that
//! drains it. The frame itself is long-lived (it exists for as long as the host
//! keeps the hook), while the scopes it creates live for exactly one
//! invocation. Live scopes are kept on a small stack: `enter` pushes, `drain`
//! pops, so a frame that is re-entered before its previous scope drained still
//! drains both, innermost first.

use crate::config::TestScopePolicy;
use crate::cx;
use crate::error::{CleanupError, Failure, PanicPayload, TestResult};
use crate::host::Hook;
use crate::record::{drain, ScopeHandle, ScopeKind, ScopeRecord, ScopeState};
use crate::types::FrameId;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

/// Runs a body, turning a panic (while building or polling it) into a failure.
pub async fn run_guarded<F>(f: F) -> TestResult
where
    F: FnOnce() -> LocalBoxFuture<'static, TestResult>,
{
    let fut = match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(fut) => fut,
        Err(payload) => return Err(Failure::Panicked(PanicPayload::from_any(payload.as_ref()))),
    };
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Failure::Panicked(PanicPayload::from_any(payload.as_ref()))),
    }
}

/// The runtime pairing of "install a scope" and "drain it" for one declaration.
#[derive(Debug)]
pub struct ScopeFrame {
    id: FrameId,
    kind: ScopeKind,
    policy: TestScopePolicy,
    live: RefCell<Vec<ScopeHandle>>,
}

impl ScopeFrame {
    /// Creates a frame for a declaration site.
    #[must_use]
    pub fn new(kind: ScopeKind, policy: TestScopePolicy) -> Rc<Self> {
        Rc::new(Self {
            id: FrameId::next(),
            kind,
            policy,
            live: RefCell::new(Vec::new()),
        })
    }

    /// Returns the frame ID.
    #[must_use]
    pub const fn id(&self) -> FrameId {
        self.id
    }

    /// Returns the kind of scope this frame creates.
    #[must_use]
    pub const fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Returns the number of scopes entered but not yet drained.
    #[must_use]
    pub fn live_scopes(&self) -> usize {
        self.live.borrow().len()
    }

    /// Allocates a fresh scope and makes it current.
    pub fn enter(&self) -> ScopeHandle {
        let scope = ScopeRecord::new_handle(self.kind);
        scope.borrow_mut().advance(ScopeState::Installed);
        cx::install(&scope);
        tracing::trace!(
            frame = %self.id,
            scope = %scope.borrow().id(),
            kind = self.kind.as_str(),
            "scope entered"
        );
        self.live.borrow_mut().push(Rc::clone(&scope));
        scope
    }

    /// Runs one invocation of a setup hook inside a fresh scope.
    ///
    /// Under [`TestScopePolicy::Private`] the scope stops being current as soon
    /// as the hook body finishes; under [`TestScopePolicy::Shared`] it stays
    /// current until [`drain`](Self::drain).
    pub async fn run_setup(&self, hook: &RefCell<Hook>) -> TestResult {
        let scope = self.enter();
        let id = scope.borrow().id();
        scope.borrow_mut().advance(ScopeState::Running);
        let result = run_guarded(|| {
            let mut hook = hook.borrow_mut();
            (&mut **hook)()
        })
        .await;
        if !self.policy.keeps_setup_installed() {
            cx::restore(id);
        }
        if let Err(err) = &result {
            tracing::debug!(frame = %self.id, scope = %id, error = %err, "setup body failed");
        }
        result
    }

    /// Drains the most recently entered scope.
    ///
    /// Cleanups run in reverse registration order, one at a time; every one of
    /// them runs even if an earlier one fails. The scope is then removed from
    /// the register (if still there) and closed. Draining with no live scope
    /// does nothing.
    pub async fn drain(&self) -> Result<(), CleanupError> {
        let Some(scope) = self.live.borrow_mut().pop() else {
            tracing::trace!(frame = %self.id, "nothing to drain");
            return Ok(());
        };
        let (id, cleanups) = {
            let mut record = scope.borrow_mut();
            (record.id(), record.begin_drain())
        };
        let report = drain(cleanups).await;
        cx::restore(id);
        scope.borrow_mut().advance(ScopeState::Closed);
        tracing::debug!(
            frame = %self.id,
            scope = %id,
            kind = self.kind.as_str(),
            ran = report.ran,
            failures = report.errors.len(),
            "scope drained"
        );
        report.into_result().map(|_| ())
    }

    /// Runs `body` in a fresh scope that is drained as soon as it finishes.
    ///
    /// The drain happens whatever the body's outcome; a body failure is
    /// reported only after the drain completed, together with the first
    /// cleanup failure if there was one.
    pub async fn run_enclosed<F>(&self, body: F) -> TestResult
    where
        F: FnOnce() -> LocalBoxFuture<'static, TestResult>,
    {
        let scope = self.enter();
        scope.borrow_mut().advance(ScopeState::Running);
        let outcome = run_guarded(body).await;
        let drained = self.drain().await;
        Failure::combine(outcome, drained)
    }
}

/// Builds the synthesized setup/drain pair for a before-kind hook.
///
/// The returned setup hook runs `hook` inside a fresh scope on every
/// invocation; the drain hook drains that scope. Register the first with the
/// host's before-kind hook and the second with the matching after-kind hook at
/// the same nesting site.
#[must_use]
pub fn scoped_pair(kind: ScopeKind, policy: TestScopePolicy, hook: Hook) -> (Hook, Hook) {
    let frame = ScopeFrame::new(kind, policy);
    let hook = Rc::new(RefCell::new(hook));

    let setup_frame = Rc::clone(&frame);
    let setup: Hook = Box::new(move || {
        let frame = Rc::clone(&setup_frame);
        let hook = Rc::clone(&hook);
        async move { frame.run_setup(&hook).await }.boxed_local()
    });

    let teardown: Hook = Box::new(move || {
        let frame = Rc::clone(&frame);
        async move { frame.drain().await.map_err(Failure::from) }.boxed_local()
    });

    (setup, teardown)
}
