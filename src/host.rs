//! The lifecycle surface consumed from a host test runner.
//!
//! The scope machinery does not run tests. It needs four things from whoever
//! does, captured by the [`Host`] trait:
//!
//! 1. before-kind hooks run before every test (and nested before-kind hook)
//!    declared in their group;
//! 2. after-kind hooks run after every test in their group, even when
//!    something failed;
//! 3. async hook and test bodies are awaited before the host moves on;
//! 4. after-kind hooks of one group run in reverse declaration order, so that
//!    paired setup/drain hooks nest.
//!
//! [`crate::lab::Suite`] is the in-crate host used by this crate's tests.

use crate::error::{Failure, TestResult};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::future::Future;

/// A hook body as stored by a host. Called once per hook invocation.
pub type Hook = Box<dyn FnMut() -> LocalBoxFuture<'static, TestResult>>;

/// A test body as stored by a host. Called at most once.
pub type TestBody = Box<dyn FnOnce() -> LocalBoxFuture<'static, TestResult>>;

/// Conversion from whatever a user body returns into a [`TestResult`].
pub trait IntoTestResult {
    /// Performs the conversion.
    fn into_test_result(self) -> TestResult;
}

impl IntoTestResult for () {
    fn into_test_result(self) -> TestResult {
        Ok(())
    }
}

impl<E> IntoTestResult for Result<(), E>
where
    E: Into<Failure>,
{
    fn into_test_result(self) -> TestResult {
        self.map_err(Into::into)
    }
}

/// Boxes a user hook closure.
pub fn hook<F, Fut>(mut f: F) -> Hook
where
    F: FnMut() -> Fut + 'static,
    Fut: Future + 'static,
    Fut::Output: IntoTestResult,
{
    Box::new(move || {
        let fut = f();
        async move { fut.await.into_test_result() }.boxed_local()
    })
}

/// Boxes a user test closure.
pub fn body<F, Fut>(f: F) -> TestBody
where
    F: FnOnce() -> Fut + 'static,
    Fut: Future + 'static,
    Fut::Output: IntoTestResult,
{
    Box::new(move || {
        let fut = f();
        async move { fut.await.into_test_result() }.boxed_local()
    })
}

/// Which tests of a suite actually execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// Runs unless some other test is focused.
    #[default]
    Normal,
    /// Focused: when any test is focused, only focused tests run.
    Only,
    /// Never runs.
    Skip,
    /// Placeholder with no body; never runs.
    Todo,
}

impl Focus {
    /// Returns true if a test with this focus may execute its body.
    #[must_use]
    pub const fn may_run(self) -> bool {
        matches!(self, Self::Normal | Self::Only)
    }
}

/// A test declaration handed to [`Host::declare`].
pub struct TestDecl {
    /// Display name.
    pub name: String,
    /// Focus/skip flavour.
    pub focus: Focus,
    /// The test is expected to fail: it passes iff its body fails.
    pub expect_failure: bool,
    /// The host runs this body concurrently with its neighbours.
    pub concurrent: bool,
    /// The body; `None` only for [`Focus::Todo`].
    pub body: Option<TestBody>,
}

impl std::fmt::Debug for TestDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestDecl")
            .field("name", &self.name)
            .field("focus", &self.focus)
            .field("expect_failure", &self.expect_failure)
            .field("concurrent", &self.concurrent)
            .field("body", &self.body.as_ref().map(|_| "<body>"))
            .finish()
    }
}

impl TestDecl {
    /// Creates a plain test declaration.
    #[must_use]
    pub fn new(name: impl Into<String>, body: TestBody) -> Self {
        Self {
            name: name.into(),
            focus: Focus::Normal,
            expect_failure: false,
            concurrent: false,
            body: Some(body),
        }
    }

    /// Creates a placeholder test with no body.
    #[must_use]
    pub fn todo(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            focus: Focus::Todo,
            expect_failure: false,
            concurrent: false,
            body: None,
        }
    }

    /// Sets the focus.
    #[must_use]
    pub fn with_focus(mut self, focus: Focus) -> Self {
        self.focus = focus;
        self
    }

    /// Marks the test as expected to fail.
    #[must_use]
    pub fn failing(mut self, expect_failure: bool) -> Self {
        self.expect_failure = expect_failure;
        self
    }

    /// Marks the test as concurrent.
    #[must_use]
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Returns true if the host will ever execute this body sequentially.
    ///
    /// Only such declarations get a private scope.
    #[must_use]
    pub fn runs_sequentially(&self) -> bool {
        self.focus.may_run() && !self.concurrent && self.body.is_some()
    }
}

/// Lifecycle hooks and test declaration entry points of a test runner.
pub trait Host {
    /// Declares a hook run once before the first test of the current group.
    fn before_all(&mut self, hook: Hook);

    /// Declares a hook run once after the last test of the current group.
    fn after_all(&mut self, hook: Hook);

    /// Declares a hook run before every test in the current group.
    fn before_each(&mut self, hook: Hook);

    /// Declares a hook run after every test in the current group.
    fn after_each(&mut self, hook: Hook);

    /// Declares a test in the current group.
    fn declare(&mut self, test: TestDecl);

    /// Declares a nested group; `body` declares its contents.
    fn describe<F>(&mut self, name: &str, body: F)
    where
        Self: Sized,
        F: FnOnce(&mut Self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn unit_and_result_convert() {
        assert!(().into_test_result().is_ok());
        assert!(Ok::<(), Failure>(()).into_test_result().is_ok());
        let err = Err::<(), &str>("bad").into_test_result().unwrap_err();
        assert_eq!(err.to_string(), "bad");
    }

    #[test]
    fn boxed_hook_can_run_repeatedly() {
        let mut calls = 0;
        let mut h = hook(move || {
            calls += 1;
            let n = calls;
            async move {
                if n > 1 {
                    Err(Failure::msg(format!("call {n}")))
                } else {
                    Ok(())
                }
            }
        });
        assert!(block_on(h()).is_ok());
        assert_eq!(block_on(h()).unwrap_err().to_string(), "call 2");
    }

    #[test]
    fn decl_flags() {
        let decl = TestDecl::new("t", body(|| async {}));
        assert!(decl.runs_sequentially());
        assert!(!TestDecl::new("t", body(|| async {}))
            .concurrent(true)
            .runs_sequentially());
        assert!(!TestDecl::new("t", body(|| async {}))
            .with_focus(Focus::Skip)
            .runs_sequentially());
        let todo = TestDecl::todo("later");
        assert!(!todo.runs_sequentially());
        assert!(format!("{todo:?}").contains("Todo"));
        assert!(Focus::Only.may_run());
    }
}
