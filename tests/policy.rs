//! Test scope policy: private per-test scopes versus shared hook scopes.

#[macro_use]
mod common;

use common::*;
use teardown_scope::intercept::Scoped;
use teardown_scope::lab::{Journal, Suite};
use teardown_scope::{teardown, Report, TeardownConfig, TestScopePolicy};

fn run_shared<F>(declare: F) -> (Report, Vec<String>)
where
    F: FnOnce(&mut Scoped<'_, Suite>, &Journal),
{
    init_test_logging();
    let journal = Journal::new();
    let mut suite = Suite::new();
    let config = TeardownConfig::new().policy(TestScopePolicy::Shared);
    declare(&mut Scoped::with_config(&mut suite, config), &journal);
    let report = suite.run();
    (report, journal.take())
}

#[test]
fn shared_test_cleanup_joins_the_before_each_scope() {
    test_phase!("shared before_each");
    let (report, lines) = run_shared(|s, journal| {
        s.before_each(step(journal, "before each", "teardown each"));
        s.test("test 1", step(journal, "test 1", "teardown test 1"));
        s.test("test 2", step(journal, "test 2", "teardown test 2"));
    });
    assert!(report.is_success(), "{report}");
    assert_eq!(
        lines,
        vec![
            "before each",
            "test 1",
            "teardown test 1",
            "teardown each",
            "before each",
            "test 2",
            "teardown test 2",
            "teardown each",
        ]
    );
}

#[test]
fn shared_test_cleanup_falls_back_to_the_group_scope() {
    let (report, lines) = run_shared(|s, journal| {
        s.describe("group", |s| {
            s.before_all(step(journal, "before all", "teardown all"));
            s.test("test 1", step(journal, "test 1", "teardown test 1"));
            s.test("test 2", step(journal, "test 2", "teardown test 2"));
        });
    });
    assert!(report.is_success(), "{report}");
    assert_eq!(
        lines,
        vec![
            "before all",
            "test 1",
            "test 2",
            "teardown test 2",
            "teardown test 1",
            "teardown all",
        ]
    );
}

#[test]
fn shared_nested_groups_attach_to_the_innermost_scope() {
    let (report, lines) = run_shared(|s, journal| {
        s.describe("outer", |s| {
            s.before_all(step(journal, "outer", "teardown outer"));
            s.describe("inner", |s| {
                s.before_all(step(journal, "inner", "teardown inner"));
                s.test("test", step(journal, "test", "teardown test"));
            });
            s.test("outer test", step(journal, "outer test", "teardown outer test"));
        });
    });
    assert!(report.is_success(), "{report}");
    assert_eq!(
        lines,
        vec![
            "outer",
            "inner",
            "test",
            "teardown test",
            "teardown inner",
            "outer test",
            "teardown outer test",
            "teardown outer",
        ]
    );
}

#[test]
fn shared_without_hooks_has_no_scope() {
    let (report, lines) = run_shared(|s, journal| {
        s.test("alone", step(journal, "alone", "never"));
    });
    assert_eq!(lines, vec!["alone"]);
    let failure = report.status("alone").and_then(|s| s.failure()).unwrap();
    assert!(failure.is_scope_error());
}

#[test]
fn private_scopes_do_not_leak_between_tests() {
    let (report, lines) = run_journaled(|s, journal| {
        s.before_all(step(journal, "before all", "teardown all"));
        s.before_each(step(journal, "before each", "teardown each"));
        s.test("test", step(journal, "test", "teardown test"));
        s.test("plain", || async {
            // Hooks' scopes are no longer current once their bodies return.
            teardown(|| {})
        });
    });
    assert!(report.is_success(), "{report}");
    assert_eq!(
        lines,
        vec![
            "before all",
            "before each",
            "test",
            "teardown test",
            "teardown each",
            "before each",
            "teardown each",
            "teardown all",
        ]
    );
}
