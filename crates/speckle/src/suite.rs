//! The suite tree: suites, tests, and the hooks attached to suites.

use crate::spec::Spec;
use std::fmt;

/// A test body or hook. Receives the [`Spec`] of the scope it runs in.
pub type Callback = Box<dyn Fn(&Spec)>;

/// The four hook kinds a suite can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum HookKind {
    BeforeAll,
    BeforeEach,
    AfterEach,
    AfterAll,
}

/// A child of a suite, in declaration order.
pub enum Node {
    Suite(SuiteNode),
    Test(TestNode),
}

/// A named group of tests and nested suites sharing hooks.
#[derive(Default)]
pub struct SuiteNode {
    pub(crate) name: String,
    pub(crate) skipped: bool,
    pub(crate) children: Vec<Node>,
    pub(crate) before_all: Vec<Callback>,
    pub(crate) before_each: Vec<Callback>,
    pub(crate) after_each: Vec<Callback>,
    pub(crate) after_all: Vec<Callback>,
}

impl SuiteNode {
    pub fn new(name: impl Into<String>) -> Self {
        SuiteNode {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Mark this suite skipped: nothing in its subtree runs.
    pub fn skip(mut self) -> Self {
        self.skipped = true;
        self
    }

    pub fn with_suite(mut self, suite: SuiteNode) -> Self {
        self.children.push(Node::Suite(suite));
        self
    }

    pub fn with_test(mut self, test: TestNode) -> Self {
        self.children.push(Node::Test(test));
        self
    }

    pub fn with_hook(mut self, kind: HookKind, hook: impl Fn(&Spec) + 'static) -> Self {
        self.hooks_mut(kind).push(Box::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn hooks(&self, kind: HookKind) -> &[Callback] {
        match kind {
            HookKind::BeforeAll => &self.before_all,
            HookKind::BeforeEach => &self.before_each,
            HookKind::AfterEach => &self.after_each,
            HookKind::AfterAll => &self.after_all,
        }
    }

    pub(crate) fn hooks_mut(&mut self, kind: HookKind) -> &mut Vec<Callback> {
        match kind {
            HookKind::BeforeAll => &mut self.before_all,
            HookKind::BeforeEach => &mut self.before_each,
            HookKind::AfterEach => &mut self.after_each,
            HookKind::AfterAll => &mut self.after_all,
        }
    }

    /// Number of tests in this subtree, pending and skipped included.
    pub fn test_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                Node::Suite(suite) => suite.test_count(),
                Node::Test(_) => 1,
            })
            .sum()
    }
}

impl fmt::Debug for SuiteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteNode")
            .field("name", &self.name)
            .field("skipped", &self.skipped)
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}

/// A single named test.
pub struct TestNode {
    pub(crate) name: String,
    pub(crate) pending: bool,
    pub(crate) body: Callback,
}

impl TestNode {
    pub fn new(name: impl Into<String>, body: impl Fn(&Spec) + 'static) -> Self {
        TestNode {
            name: name.into(),
            pending: false,
            body: Box::new(body),
        }
    }

    /// A test that is reported pending and never run.
    pub fn pending(name: impl Into<String>, body: impl Fn(&Spec) + 'static) -> Self {
        TestNode {
            pending: true,
            ..TestNode::new(name, body)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Join non-empty path segments the way reports print them.
pub(crate) fn join_path<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" > ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_shape_the_tree() {
        let suite = SuiteNode::new("outer")
            .with_hook(HookKind::BeforeEach, |_| {})
            .with_test(TestNode::new("a", |_| {}))
            .with_suite(SuiteNode::new("inner").with_test(TestNode::pending("b", |_| {})))
            .with_suite(SuiteNode::new("off").skip());

        assert_eq!(suite.name(), "outer");
        assert_eq!(suite.children().len(), 3);
        assert_eq!(suite.hooks(HookKind::BeforeEach).len(), 1);
        assert!(suite.hooks(HookKind::AfterAll).is_empty());
        assert_eq!(suite.test_count(), 2);
        match &suite.children()[2] {
            Node::Suite(off) => assert!(off.is_skipped()),
            Node::Test(_) => panic!("expected a suite"),
        }
    }

    #[test]
    fn join_path_skips_unnamed_roots() {
        assert_eq!(join_path(["", "A", "B", "t"]), "A > B > t");
    }

    #[test]
    fn hook_kinds_display_snake_case() {
        assert_eq!(HookKind::BeforeAll.to_string(), "before_all");
        assert_eq!(HookKind::AfterEach.to_string(), "after_each");
    }
}
