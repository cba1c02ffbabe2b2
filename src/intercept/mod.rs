//! Hook interception: declaring a setup also declares its drain.
//!
//! [`Scoped`] wraps a [`Host`] at the declaration site. Every `before_all` or
//! `before_each` declared through it becomes a [`ScopeFrame`]: the host gets a
//! setup hook that runs the user's hook inside a fresh scope, plus a drain hook
//! registered on the matching after-kind at the same nesting level. Because
//! each group declares its own frames, nested groups stack naturally: an inner
//! group's frames are entered after and drained before the outer group's.
//!
//! Test declarations go through the same wrapper. Under the default
//! [`TestScopePolicy::Private`] each sequentially executed test body runs in
//! its own scope, drained when the body finishes whether it passed or not.
//! Skipped, todo and concurrent tests are handed to the host untouched.
//!
//! ```ignore
//! use teardown_scope::{cx::teardown, intercept::Scoped, lab::Suite};
//!
//! let mut suite = Suite::new();
//! Scoped::new(&mut suite).describe("server", |s| {
//!     s.before_all(|| async {
//!         let server = start_server();
//!         teardown(move || server.stop())
//!     });
//!     s.test("responds", || async { /* ... */ });
//! });
//! let report = suite.run();
//! ```

pub mod frame;

pub use frame::{run_guarded, scoped_pair, ScopeFrame};

use crate::config::{TeardownConfig, TestScopePolicy};
use crate::host::{body, hook, Focus, Host, IntoTestResult, TestDecl};
use crate::record::ScopeKind;
use futures::FutureExt;
use std::future::Future;
use std::rc::Rc;

/// Wraps a test body so that it runs in a private scope.
#[must_use]
pub fn wrap_test(test: crate::host::TestBody) -> crate::host::TestBody {
    let frame = ScopeFrame::new(ScopeKind::Test, TestScopePolicy::Private);
    Box::new(move || async move { frame.run_enclosed(test).await }.boxed_local())
}

/// Declaration-site decorator over a [`Host`].
pub struct Scoped<'h, H: Host> {
    host: &'h mut H,
    config: TeardownConfig,
}

impl<'h, H: Host> Scoped<'h, H> {
    /// Wraps `host` with the default configuration.
    pub fn new(host: &'h mut H) -> Self {
        Self::with_config(host, TeardownConfig::default())
    }

    /// Wraps `host` with an explicit configuration.
    pub fn with_config(host: &'h mut H, config: TeardownConfig) -> Self {
        Self { host, config }
    }

    /// Returns the wrapped host.
    pub fn host(&mut self) -> &mut H {
        self.host
    }

    /// Returns the active test scope policy.
    #[must_use]
    pub fn policy(&self) -> TestScopePolicy {
        self.config.policy
    }

    /// Declares a run-once-before-group hook with its own scope.
    ///
    /// Cleanups registered while it runs drain after the group's last test.
    pub fn before_all<F, Fut>(&mut self, f: F)
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        let (setup, drain) = scoped_pair(ScopeKind::Group, self.config.policy, hook(f));
        self.host.before_all(setup);
        self.host.after_all(drain);
    }

    /// Declares a run-before-each-test hook with its own scope.
    ///
    /// Every run starts with an empty list; cleanups registered while it runs
    /// drain right after the test.
    pub fn before_each<F, Fut>(&mut self, f: F)
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        let (setup, drain) = scoped_pair(ScopeKind::Each, self.config.policy, hook(f));
        self.host.before_each(setup);
        self.host.after_each(drain);
    }

    /// Declares a plain after-group hook (no scope of its own).
    pub fn after_all<F, Fut>(&mut self, f: F)
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.host.after_all(hook(f));
    }

    /// Declares a plain after-each hook (no scope of its own).
    pub fn after_each<F, Fut>(&mut self, f: F)
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.host.after_each(hook(f));
    }

    /// Declares a nested group whose declarations are intercepted too.
    pub fn describe<F>(&mut self, name: &str, body: F)
    where
        H: Sized,
        F: FnOnce(&mut Scoped<'_, H>),
    {
        let config = self.config.clone();
        self.host.describe(name, move |host| {
            let mut scoped = Scoped::with_config(host, config);
            body(&mut scoped);
        });
    }

    /// Hands a declaration to the host, wrapping its body when it needs a scope.
    pub fn declare(&mut self, mut decl: TestDecl) {
        if self.config.policy.wraps_tests() && decl.runs_sequentially() {
            decl.body = decl.body.take().map(wrap_test);
        }
        self.host.declare(decl);
    }

    fn declare_with<F, Fut>(&mut self, name: &str, focus: Focus, expect_failure: bool, f: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.declare(
            TestDecl::new(name, body(f))
                .with_focus(focus)
                .failing(expect_failure),
        );
    }

    /// Declares a test.
    pub fn test<F, Fut>(&mut self, name: &str, f: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.declare_with(name, Focus::Normal, false, f);
    }

    /// Alias of [`test`](Self::test).
    pub fn it<F, Fut>(&mut self, name: &str, f: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.test(name, f);
    }

    /// Declares a focused test.
    pub fn only<F, Fut>(&mut self, name: &str, f: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.declare_with(name, Focus::Only, false, f);
    }

    /// Declares a test that is expected to fail.
    pub fn failing<F, Fut>(&mut self, name: &str, f: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.declare_with(name, Focus::Normal, true, f);
    }

    /// Declares a focused test that is expected to fail.
    pub fn only_failing<F, Fut>(&mut self, name: &str, f: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.declare_with(name, Focus::Only, true, f);
    }

    /// Declares a skipped test. Its body never runs and gets no scope.
    pub fn skip<F, Fut>(&mut self, name: &str, f: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.declare_with(name, Focus::Skip, false, f);
    }

    /// Declares a skipped expected-to-fail test.
    pub fn skip_failing<F, Fut>(&mut self, name: &str, f: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.declare_with(name, Focus::Skip, true, f);
    }

    /// Declares a placeholder test with no body.
    pub fn todo(&mut self, name: &str) {
        self.declare(TestDecl::todo(name));
    }

    /// Declares a test the host runs concurrently with its neighbours.
    ///
    /// The body is never wrapped: registering a teardown from it fails.
    pub fn concurrent<F, Fut>(&mut self, name: &str, f: F)
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.declare(TestDecl::new(name, body(f)).concurrent(true));
    }

    fn each_with<T, I, F, Fut>(
        &mut self,
        rows: I,
        name: &str,
        focus: Focus,
        expect_failure: bool,
        f: F,
    ) where
        I: IntoIterator<Item = T>,
        T: 'static,
        F: Fn(T) -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        let f = Rc::new(f);
        for (index, row) in rows.into_iter().enumerate() {
            let f = Rc::clone(&f);
            self.declare_with(
                &format!("{name} #{index}"),
                focus,
                expect_failure,
                move || f(row),
            );
        }
    }

    /// Declares one test per row; each row's body gets its own scope.
    pub fn each<T, I, F, Fut>(&mut self, rows: I, name: &str, f: F)
    where
        I: IntoIterator<Item = T>,
        T: 'static,
        F: Fn(T) -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.each_with(rows, name, Focus::Normal, false, f);
    }

    /// Focused variant of [`each`](Self::each).
    pub fn only_each<T, I, F, Fut>(&mut self, rows: I, name: &str, f: F)
    where
        I: IntoIterator<Item = T>,
        T: 'static,
        F: Fn(T) -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.each_with(rows, name, Focus::Only, false, f);
    }

    /// Expected-to-fail variant of [`each`](Self::each).
    pub fn failing_each<T, I, F, Fut>(&mut self, rows: I, name: &str, f: F)
    where
        I: IntoIterator<Item = T>,
        T: 'static,
        F: Fn(T) -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.each_with(rows, name, Focus::Normal, true, f);
    }

    /// Skipped variant of [`each`](Self::each).
    pub fn skip_each<T, I, F, Fut>(&mut self, rows: I, name: &str, f: F)
    where
        I: IntoIterator<Item = T>,
        T: 'static,
        F: Fn(T) -> Fut + 'static,
        Fut: Future + 'static,
        Fut::Output: IntoTestResult,
    {
        self.each_with(rows, name, Focus::Skip, false, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cx::teardown;
    use crate::error::{Failure, TestResult};
    use crate::host::{Hook, TestBody};
    use futures::executor::block_on;
    use std::cell::RefCell;

    /// Host that records declarations without running anything.
    #[derive(Default)]
    struct Recorder {
        before_all: Vec<Hook>,
        after_all: Vec<Hook>,
        before_each: Vec<Hook>,
        after_each: Vec<Hook>,
        tests: Vec<TestDecl>,
        groups: Vec<String>,
    }

    impl Host for Recorder {
        fn before_all(&mut self, hook: Hook) {
            self.before_all.push(hook);
        }
        fn after_all(&mut self, hook: Hook) {
            self.after_all.push(hook);
        }
        fn before_each(&mut self, hook: Hook) {
            self.before_each.push(hook);
        }
        fn after_each(&mut self, hook: Hook) {
            self.after_each.push(hook);
        }
        fn declare(&mut self, test: TestDecl) {
            self.tests.push(test);
        }
        fn describe<F>(&mut self, name: &str, body: F)
        where
            F: FnOnce(&mut Self),
        {
            self.groups.push(name.to_string());
            body(self);
        }
    }

    fn run_body(body: TestBody) -> TestResult {
        block_on(body())
    }

    #[test]
    fn before_hooks_come_with_paired_drains() {
        let mut host = Recorder::default();
        {
            let mut s = Scoped::new(&mut host);
            s.before_all(|| async {});
            s.before_each(|| async {});
            s.before_each(|| async {});
            s.after_each(|| async {});
        }
        assert_eq!(host.before_all.len(), 1);
        assert_eq!(host.after_all.len(), 1);
        assert_eq!(host.before_each.len(), 2);
        assert_eq!(host.after_each.len(), 3);
    }

    #[test]
    fn describe_keeps_intercepting() {
        let mut host = Recorder::default();
        Scoped::new(&mut host).describe("outer", |s| {
            s.describe("inner", |s| {
                s.before_all(|| async {});
            });
        });
        assert_eq!(host.groups, vec!["outer", "inner"]);
        assert_eq!(host.after_all.len(), 1);
    }

    #[test]
    fn wrapped_test_owns_a_scope() {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let mut host = Recorder::default();
        let l = lines.clone();
        Scoped::new(&mut host).test("t", move || async move {
            let inner = l.clone();
            teardown(move || inner.borrow_mut().push("cleanup"))?;
            l.borrow_mut().push("body");
            Ok::<(), Failure>(())
        });
        let decl = host.tests.pop().unwrap();
        run_body(decl.body.unwrap()).unwrap();
        assert_eq!(*lines.borrow(), vec!["body", "cleanup"]);
    }

    #[test]
    fn shared_policy_leaves_tests_unwrapped() {
        let mut host = Recorder::default();
        Scoped::with_config(
            &mut host,
            TeardownConfig::new().policy(TestScopePolicy::Shared),
        )
        .test("t", || async { teardown(|| {}) });
        let decl = host.tests.pop().unwrap();
        let err = run_body(decl.body.unwrap()).unwrap_err();
        assert!(err.is_scope_error());
    }

    #[test]
    fn skipped_todo_and_concurrent_are_not_wrapped() {
        let mut host = Recorder::default();
        {
            let mut s = Scoped::new(&mut host);
            s.skip("skipped", || async { teardown(|| {}) });
            s.todo("later");
            s.concurrent("parallel", || async { teardown(|| {}) });
        }
        let concurrent = host.tests.pop().unwrap();
        assert!(concurrent.concurrent);
        assert!(run_body(concurrent.body.unwrap())
            .unwrap_err()
            .is_scope_error());

        let todo = host.tests.pop().unwrap();
        assert_eq!(todo.focus, Focus::Todo);
        assert!(todo.body.is_none());

        let skipped = host.tests.pop().unwrap();
        assert_eq!(skipped.focus, Focus::Skip);
        assert!(run_body(skipped.body.unwrap()).unwrap_err().is_scope_error());
    }

    #[test]
    fn each_declares_one_test_per_row() {
        let mut host = Recorder::default();
        Scoped::new(&mut host).failing_each([(1, 2, 3), (2, 3, 4)], "row", |(a, b, c)| async move {
            assert_eq!(a + b, c + 1);
        });
        let names: Vec<&str> = host.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["row #0", "row #1"]);
        assert!(host.tests.iter().all(|t| t.expect_failure));
    }
}
