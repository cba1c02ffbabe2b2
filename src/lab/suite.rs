//! Declaration tree built by the lab host.

use super::config::LabConfig;
use super::report::Report;
use super::runner::Runner;
use crate::host::{Focus, Hook, Host, TestDecl};

/// A group of hooks, tests and nested groups.
#[derive(Default)]
pub(crate) struct Group {
    pub(crate) name: String,
    pub(crate) before_all: Vec<Hook>,
    pub(crate) after_all: Vec<Hook>,
    pub(crate) before_each: Vec<Hook>,
    pub(crate) after_each: Vec<Hook>,
    pub(crate) children: Vec<Node>,
}

/// One entry of a group, in declaration order.
pub(crate) enum Node {
    Test(TestDecl),
    Group(Group),
}

impl Group {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Returns true if any test in this group (recursively) will execute.
    pub(crate) fn has_runnable(&self, focused: bool) -> bool {
        self.children.iter().any(|node| match node {
            Node::Test(decl) => will_run(decl, focused),
            Node::Group(group) => group.has_runnable(focused),
        })
    }

    /// Returns true if any test in this group (recursively) is focused.
    pub(crate) fn has_focus(&self) -> bool {
        self.children.iter().any(|node| match node {
            Node::Test(decl) => decl.focus == Focus::Only,
            Node::Group(group) => group.has_focus(),
        })
    }
}

/// Returns true if the body of `decl` executes in a run.
pub(crate) fn will_run(decl: &TestDecl, focused: bool) -> bool {
    decl.body.is_some()
        && match decl.focus {
            Focus::Only => true,
            Focus::Normal => !focused,
            Focus::Skip | Focus::Todo => false,
        }
}

/// In-crate host: collects declarations, then runs them on one thread.
///
/// ```ignore
/// let mut suite = Suite::new();
/// suite.describe("group", |g| {
///     g.before_each(hook(|| async { /* ... */ }));
///     g.declare(TestDecl::new("works", body(|| async { /* ... */ })));
/// });
/// let report = suite.run();
/// assert!(report.is_success());
/// ```
pub struct Suite {
    config: LabConfig,
    root: Group,
    open: Vec<Group>,
}

impl Suite {
    /// Creates an empty suite with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LabConfig::default())
    }

    /// Creates an empty suite with an explicit configuration.
    #[must_use]
    pub fn with_config(config: LabConfig) -> Self {
        Self {
            config,
            root: Group::default(),
            open: Vec::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    fn current(&mut self) -> &mut Group {
        self.open.last_mut().unwrap_or(&mut self.root)
    }

    /// Runs every declared test, blocking the current thread.
    #[must_use]
    pub fn run(self) -> Report {
        futures::executor::block_on(self.run_async())
    }

    /// Runs every declared test on the caller's executor.
    ///
    /// The executor must poll on a single thread.
    pub async fn run_async(self) -> Report {
        let Self { config, root, .. } = self;
        Runner::new(config, root.has_focus()).run(root).await
    }
}

impl Default for Suite {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for Suite {
    fn before_all(&mut self, hook: Hook) {
        self.current().before_all.push(hook);
    }

    fn after_all(&mut self, hook: Hook) {
        self.current().after_all.push(hook);
    }

    fn before_each(&mut self, hook: Hook) {
        self.current().before_each.push(hook);
    }

    fn after_each(&mut self, hook: Hook) {
        self.current().after_each.push(hook);
    }

    fn declare(&mut self, test: TestDecl) {
        self.current().children.push(Node::Test(test));
    }

    fn describe<F>(&mut self, name: &str, body: F)
    where
        F: FnOnce(&mut Self),
    {
        self.open.push(Group::named(name));
        body(self);
        if let Some(group) = self.open.pop() {
            self.current().children.push(Node::Group(group));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::body;

    fn decl(name: &str, focus: Focus) -> TestDecl {
        TestDecl::new(name, body(|| async {})).with_focus(focus)
    }

    #[test]
    fn describe_nests_groups() {
        let mut suite = Suite::new();
        suite.declare(decl("top", Focus::Normal));
        suite.describe("outer", |s| {
            s.describe("inner", |s| s.declare(decl("deep", Focus::Only)));
            s.declare(decl("mid", Focus::Normal));
        });

        assert!(suite.open.is_empty());
        assert_eq!(suite.root.children.len(), 2);
        let Node::Group(outer) = &suite.root.children[1] else {
            panic!("expected group");
        };
        assert_eq!(outer.name, "outer");
        assert_eq!(outer.children.len(), 2);
        assert!(suite.root.has_focus());
        assert!(outer.has_runnable(true));
    }

    #[test]
    fn focus_filters_runnable() {
        assert!(will_run(&decl("a", Focus::Normal), false));
        assert!(!will_run(&decl("a", Focus::Normal), true));
        assert!(will_run(&decl("a", Focus::Only), true));
        assert!(!will_run(&decl("a", Focus::Skip), false));
        assert!(!will_run(&TestDecl::todo("a"), false));
    }
}
