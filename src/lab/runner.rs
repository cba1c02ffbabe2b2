//! Execution of a declaration tree.
//!
//! Ordering rules:
//! - before-all hooks run once, in declaration order, before the first test
//!   of their group; a group with nothing to run runs no hooks at all;
//! - before-each hooks run outermost group first, after-each hooks innermost
//!   group first;
//! - after-kind hooks of one group run in reverse declaration order, and run
//!   even if their before-kind counterpart or the test failed;
//! - consecutive concurrent tests are polled together in batches, outside
//!   any scope and without per-test hooks.

use super::config::LabConfig;
use super::report::{GroupHook, Report, TestStatus};
use super::suite::{will_run, Group, Node};
use crate::cx;
use crate::error::{Failure, TestResult};
use crate::host::{Focus, Hook, TestDecl};
use crate::intercept::run_guarded;
use futures::future::{join_all, LocalBoxFuture};
use futures::FutureExt;
use std::sync::Arc;

/// Per-each hooks contributed by one enclosing group.
struct EachLevel {
    before: Vec<Hook>,
    after: Vec<Hook>,
}

pub(crate) struct Runner {
    config: LabConfig,
    focused: bool,
    bailed: bool,
    report: Report,
}

fn full_name(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path} > {name}")
    }
}

async fn run_hook(hook: &mut Hook) -> TestResult {
    run_guarded(|| hook()).await
}

/// Decides the status of a test from the outcomes of its phases.
fn evaluate(
    expect_failure: bool,
    before: Option<Failure>,
    outcome: TestResult,
    after: Option<Failure>,
) -> TestStatus {
    if let Some(failure) = before {
        return TestStatus::Failed(Arc::new(failure));
    }
    let status = if expect_failure {
        match outcome {
            Ok(()) => TestStatus::Failed(Arc::new(Failure::msg(
                "expected test to fail, but it passed",
            ))),
            Err(failure) if failure.is_body_failure() && failure.cleanup_error().is_none() => {
                TestStatus::Passed
            }
            Err(failure) => TestStatus::Failed(Arc::new(failure)),
        }
    } else {
        match outcome {
            Ok(()) => TestStatus::Passed,
            Err(failure) => TestStatus::Failed(Arc::new(failure)),
        }
    };
    match (status, after) {
        (TestStatus::Passed, Some(failure)) => TestStatus::Failed(Arc::new(failure)),
        (status, _) => status,
    }
}

impl Runner {
    pub(crate) fn new(config: LabConfig, focused: bool) -> Self {
        Self {
            config,
            focused,
            bailed: false,
            report: Report::default(),
        }
    }

    pub(crate) async fn run(mut self, root: Group) -> Report {
        let mut levels = Vec::new();
        self.run_group(root, String::new(), &mut levels, None).await;
        tracing::debug!(
            passed = self.report.passed(),
            failed = self.report.failed(),
            skipped = self.report.skipped(),
            "suite finished"
        );
        self.report
    }

    /// Status of a test that never executes, or `None` if it should.
    fn gate(&self, decl: &TestDecl, inherited: Option<&Arc<Failure>>) -> Option<TestStatus> {
        if decl.focus == Focus::Todo || decl.body.is_none() {
            return Some(TestStatus::Todo);
        }
        if !will_run(decl, self.focused) || self.bailed {
            return Some(TestStatus::Skipped);
        }
        inherited.map(|failure| TestStatus::Failed(Arc::clone(failure)))
    }

    fn finish(&mut self, name: String, status: TestStatus) {
        if self.config.bail && status.is_failed() {
            self.bailed = true;
        }
        self.report.record(name, status);
    }

    /// Records every test of a group that is not going to run.
    fn settle(&mut self, group: Group, path: &str) {
        for node in group.children {
            match node {
                Node::Test(decl) => {
                    let status = if decl.focus == Focus::Todo {
                        TestStatus::Todo
                    } else {
                        TestStatus::Skipped
                    };
                    self.report.record(full_name(path, &decl.name), status);
                }
                Node::Group(child) => {
                    let child_path = full_name(path, &child.name);
                    self.settle(child, &child_path);
                }
            }
        }
    }

    fn run_group<'a>(
        &'a mut self,
        group: Group,
        path: String,
        levels: &'a mut Vec<EachLevel>,
        inherited: Option<Arc<Failure>>,
    ) -> LocalBoxFuture<'a, ()> {
        async move {
            if self.bailed || !group.has_runnable(self.focused) {
                tracing::trace!(group = %path, "nothing to run in group");
                self.settle(group, &path);
                return;
            }
            let Group {
                mut before_all,
                mut after_all,
                before_each,
                after_each,
                children,
                ..
            } = group;

            let mut setup_failure = inherited;
            if setup_failure.is_none() {
                for hook in &mut before_all {
                    if let Err(err) = run_hook(hook).await {
                        let err = Arc::new(err);
                        self.report
                            .record_hook_failure(path.clone(), GroupHook::BeforeAll, Arc::clone(&err));
                        setup_failure = Some(err);
                        break;
                    }
                }
            }

            levels.push(EachLevel {
                before: before_each,
                after: after_each,
            });
            let mut batch = Vec::new();
            for node in children {
                match node {
                    Node::Test(decl) if decl.concurrent && will_run(&decl, self.focused) => {
                        batch.push(decl);
                    }
                    Node::Test(decl) => {
                        self.run_batch(&mut batch, &path, setup_failure.as_ref()).await;
                        self.run_test(decl, &path, levels, setup_failure.as_ref()).await;
                    }
                    Node::Group(child) => {
                        self.run_batch(&mut batch, &path, setup_failure.as_ref()).await;
                        let child_path = full_name(&path, &child.name);
                        self.run_group(child, child_path, levels, setup_failure.clone())
                            .await;
                    }
                }
            }
            self.run_batch(&mut batch, &path, setup_failure.as_ref()).await;
            levels.pop();

            for hook in after_all.iter_mut().rev() {
                if let Err(err) = run_hook(hook).await {
                    self.report
                        .record_hook_failure(path.clone(), GroupHook::AfterAll, Arc::new(err));
                }
            }
        }
        .boxed_local()
    }

    async fn run_test(
        &mut self,
        decl: TestDecl,
        path: &str,
        levels: &mut [EachLevel],
        inherited: Option<&Arc<Failure>>,
    ) {
        let name = full_name(path, &decl.name);
        if let Some(status) = self.gate(&decl, inherited) {
            self.finish(name, status);
            return;
        }
        let TestDecl {
            expect_failure,
            body,
            ..
        } = decl;
        tracing::trace!(test = %name, "test started");

        let mut before = None;
        'levels: for level in levels.iter_mut() {
            for hook in &mut level.before {
                if let Err(err) = run_hook(hook).await {
                    before = Some(err);
                    break 'levels;
                }
            }
        }

        let outcome = match (&before, body) {
            (None, Some(body)) => run_guarded(body).await,
            _ => Ok(()),
        };

        let mut after = None;
        for level in levels.iter_mut().rev() {
            for hook in level.after.iter_mut().rev() {
                if let Err(err) = run_hook(hook).await {
                    if after.is_none() {
                        after = Some(err);
                    } else {
                        tracing::warn!(test = %name, error = %err, "further after-each failure");
                    }
                }
            }
        }

        let status = evaluate(expect_failure, before, outcome, after);
        self.finish(name, status);
    }

    /// Polls queued concurrent tests together, `batch_size` at a time.
    async fn run_batch(
        &mut self,
        batch: &mut Vec<TestDecl>,
        path: &str,
        inherited: Option<&Arc<Failure>>,
    ) {
        while !batch.is_empty() {
            let take = self.config.batch_size().min(batch.len());
            let chunk: Vec<TestDecl> = batch.drain(..take).collect();
            let mut pending = Vec::with_capacity(chunk.len());
            let mut runs = Vec::new();
            for decl in chunk {
                let name = full_name(path, &decl.name);
                if let Some(status) = self.gate(&decl, inherited) {
                    self.finish(name, status);
                    continue;
                }
                if let Some(body) = decl.body {
                    pending.push((name, decl.expect_failure));
                    runs.push(run_guarded(body));
                }
            }
            if runs.is_empty() {
                continue;
            }
            tracing::trace!(group = %path, tests = runs.len(), "running concurrent batch");
            let outcomes = {
                let _detached = cx::detach();
                join_all(runs).await
            };
            for ((name, expect_failure), outcome) in pending.into_iter().zip(outcomes) {
                self.finish(name, evaluate(expect_failure, None, outcome, None));
            }
        }
    }
}
