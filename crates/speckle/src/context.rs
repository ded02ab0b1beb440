//! Closure-based declaration API — `Context`, `build()`, and `run()`.

use crate::runner::{self, RunConfig};
use crate::spec::Spec;
use crate::suite::{HookKind, Node, SuiteNode, TestNode};
use crate::Guard;

// ============================================================================
// Context — the user-facing handle
// ============================================================================

/// Handle for declaring suites, tests and hooks.
///
/// Each `describe` callback receives a fresh `Context` for the suite it
/// declares, so `it` and the hook methods always attach to the innermost
/// open suite without any shared state.
///
/// # Example
/// ```rust
/// let root = speckle::build(|ctx| {
///     ctx.describe("Calculator", |ctx| {
///         ctx.it("adds", |spec| {
///             spec.expect(2 + 3).to_be(5);
///         });
///     });
/// });
/// assert_eq!(root.test_count(), 1);
/// ```
pub struct Context<'a> {
    suite: &'a mut SuiteNode,
}

impl<'a> Context<'a> {
    pub(crate) fn new(suite: &'a mut SuiteNode) -> Self {
        Context { suite }
    }

    // ---- Describe / Context --------------------------------------------------

    /// Declare a nested suite. `body` runs immediately to populate it.
    pub fn describe(&mut self, name: &str, body: impl FnOnce(&mut Context<'_>)) {
        self.describe_impl(name, false, body);
    }

    /// Declare a skipped suite: it is built but nothing inside runs.
    pub fn xdescribe(&mut self, name: &str, body: impl FnOnce(&mut Context<'_>)) {
        self.describe_impl(name, true, body);
    }

    pub fn context(&mut self, name: &str, body: impl FnOnce(&mut Context<'_>)) {
        self.describe(name, body);
    }

    pub fn xcontext(&mut self, name: &str, body: impl FnOnce(&mut Context<'_>)) {
        self.xdescribe(name, body);
    }

    fn describe_impl(&mut self, name: &str, skipped: bool, body: impl FnOnce(&mut Context<'_>)) {
        let mut suite = SuiteNode::new(name);
        suite.skipped = skipped;
        body(&mut Context::new(&mut suite));
        self.suite.children.push(Node::Suite(suite));
    }

    // ---- It / Specify --------------------------------------------------------

    /// Declare a test.
    pub fn it(&mut self, name: &str, body: impl Fn(&Spec) + 'static) {
        self.suite.children.push(Node::Test(TestNode::new(name, body)));
    }

    /// Declare a pending test: reported, never run.
    pub fn xit(&mut self, name: &str, body: impl Fn(&Spec) + 'static) {
        self.suite.children.push(Node::Test(TestNode::pending(name, body)));
    }

    pub fn specify(&mut self, name: &str, body: impl Fn(&Spec) + 'static) {
        self.it(name, body);
    }

    pub fn xspecify(&mut self, name: &str, body: impl Fn(&Spec) + 'static) {
        self.xit(name, body);
    }

    // ---- Hooks ---------------------------------------------------------------

    /// Runs before every test in this suite and its nested suites.
    pub fn before_each(&mut self, hook: impl Fn(&Spec) + 'static) {
        self.hook(HookKind::BeforeEach, hook);
    }

    /// Runs after every test in this suite and its nested suites, even when
    /// the test fails.
    pub fn after_each(&mut self, hook: impl Fn(&Spec) + 'static) {
        self.hook(HookKind::AfterEach, hook);
    }

    /// Runs once, before the first test of this suite.
    pub fn before_all(&mut self, hook: impl Fn(&Spec) + 'static) {
        self.hook(HookKind::BeforeAll, hook);
    }

    /// Runs once, after every test of this suite (nested ones included).
    pub fn after_all(&mut self, hook: impl Fn(&Spec) + 'static) {
        self.hook(HookKind::AfterAll, hook);
    }

    fn hook(&mut self, kind: HookKind, hook: impl Fn(&Spec) + 'static) {
        self.suite.hooks_mut(kind).push(Box::new(hook));
    }
}

// ============================================================================
// build() / run() — entry points
// ============================================================================

/// Run the declaration phase and return the unnamed root suite.
///
/// Tests and hooks declared directly on the root context apply to the whole
/// tree.
pub fn build(body: impl FnOnce(&mut Context<'_>)) -> SuiteNode {
    let mut root = SuiteNode::new("");
    body(&mut Context::new(&mut root));
    root
}

/// Build and run a suite tree, print the report, and exit with status 1 if
/// anything failed.
///
/// Call it from `fn main()` in a test target with `harness = false`.
///
/// # Example
///
/// ```rust,no_run
/// fn main() {
///     speckle::run(|ctx| {
///         ctx.describe("Calculator", |ctx| {
///             ctx.it("adds", |spec| { spec.expect(2 + 3).to_be(5); });
///         });
///     });
/// }
/// ```
pub fn run(body: impl FnOnce(&mut Context<'_>)) {
    run_suite(build(body));
}

/// Run an already-built tree (for example one produced by `suite!`) the way
/// [`run`] does.
pub fn run_suite(root: SuiteNode) {
    crate::init_logging();

    let config = RunConfig::from_args();
    if config.list {
        crate::report::print_list(&[root], &config);
        return;
    }

    // Panics are reported per test; keep the default hook from printing them too.
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let restore_hook = Guard::new(move || std::panic::set_hook(previous_hook));
    let report = runner::run_tree(std::slice::from_ref(&root), &config);
    drop(restore_hook);

    crate::report::print_report(&report);

    if report.has_failures() {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_nest_in_order() {
        let root = build(|ctx| {
            ctx.before_each(|_| {});
            ctx.describe("A", |ctx| {
                ctx.it("first", |_| {});
                ctx.context("B", |ctx| {
                    ctx.after_all(|_| {});
                    ctx.specify("second", |_| {});
                });
                ctx.xit("third", |_| {});
            });
            ctx.xdescribe("C", |ctx| {
                ctx.it("never", |_| panic!("skipped"));
            });
        });

        assert_eq!(root.name(), "");
        assert_eq!(root.hooks(HookKind::BeforeEach).len(), 1);
        assert_eq!(root.test_count(), 4);

        let Node::Suite(a) = &root.children()[0] else {
            panic!("expected suite A");
        };
        let names: Vec<&str> = a
            .children()
            .iter()
            .map(|n| match n {
                Node::Suite(s) => s.name(),
                Node::Test(t) => t.name(),
            })
            .collect();
        assert_eq!(names, ["first", "B", "third"]);

        let Node::Test(third) = &a.children()[2] else {
            panic!("expected test");
        };
        assert!(third.is_pending());

        let Node::Suite(c) = &root.children()[1] else {
            panic!("expected suite C");
        };
        assert!(c.is_skipped());
    }

    #[test]
    fn hooks_attach_to_the_innermost_suite() {
        let root = build(|ctx| {
            ctx.describe("outer", |ctx| {
                ctx.before_all(|_| {});
                ctx.describe("inner", |ctx| {
                    ctx.before_each(|_| {});
                    ctx.after_each(|_| {});
                });
            });
        });
        let Node::Suite(outer) = &root.children()[0] else {
            panic!("expected suite");
        };
        let Node::Suite(inner) = &outer.children()[0] else {
            panic!("expected suite");
        };
        assert_eq!(outer.hooks(HookKind::BeforeAll).len(), 1);
        assert!(outer.hooks(HookKind::BeforeEach).is_empty());
        assert_eq!(inner.hooks(HookKind::BeforeEach).len(), 1);
        assert_eq!(inner.hooks(HookKind::AfterEach).len(), 1);
    }
}
