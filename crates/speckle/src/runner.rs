//! Suite runner — walks the tree depth-first and collects results.
//!
//! Execution is sequential. Every hook and body runs inside `catch_unwind`,
//! so a panic fails one test (or one suite, for `before_all`/`after_all`)
//! and the run always completes.

use crate::error::{panic_message, Failure};
use crate::scheduler::{HookScheduler, Step};
use crate::spec::Spec;
use crate::suite::{join_path, Callback, HookKind, Node, SuiteNode, TestNode};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

// ============================================================================
// Results
// ============================================================================

/// Final state of one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Pending,
    Skipped,
}

/// Outcome of one test.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Names of the enclosing suites, outermost first (unnamed roots omitted).
    pub suites: Vec<String>,
    /// Position of each of those suites among its parent's children, so two
    /// sibling suites that share a name stay apart.
    pub scope: Vec<usize>,
    pub name: String,
    pub status: Status,
    pub failures: Vec<Failure>,
    pub duration: Duration,
}

impl ExecutionResult {
    /// `Suite > Nested > test`
    pub fn full_path(&self) -> String {
        join_path(self.suites.iter().map(String::as_str).chain([self.name.as_str()]))
    }

    fn fail_with(&mut self, failure: Failure) {
        self.status = Status::Failed;
        self.failures.push(failure);
    }
}

/// Counts per status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.pending + self.skipped
    }
}

/// Everything a run produced, in execution order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<ExecutionResult>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for result in &self.results {
            match result.status {
                Status::Passed => summary.passed += 1,
                Status::Failed => summary.failed += 1,
                Status::Pending => summary.pending += 1,
                Status::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| r.status == Status::Failed)
    }

    /// Look a result up by its full path.
    pub fn get(&self, path: &str) -> Option<&ExecutionResult> {
        self.results.iter().find(|r| r.full_path() == path)
    }

    /// Every failure, in the order it was recorded.
    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.results.iter().flat_map(|r| r.failures.iter())
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration parsed from command-line args.
#[derive(Debug, Default, Clone)]
pub struct RunConfig {
    /// Only run tests whose full path contains this (case-insensitive).
    pub filter: Option<String>,
    /// Only list tests, don't run them.
    pub list: bool,
}

impl RunConfig {
    /// Parse from the process args (compatible with `cargo test -- <args>`).
    pub fn from_args() -> Self {
        Self::parse(std::env::args().skip(1))
    }

    pub fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut config = RunConfig::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--list" => config.list = true,
                // libtest flags whose value comes as the next argument
                "--skip" | "--test-threads" | "--format" | "--color" | "--logfile" | "-Z" => {
                    args.next();
                }
                a if !a.starts_with('-') => config.filter = Some(arg),
                _ => {} // ignore unknown flags
            }
        }
        config
    }

    pub fn matches(&self, full_path: &str) -> bool {
        match &self.filter {
            Some(f) => full_path.to_lowercase().contains(&f.to_lowercase()),
            None => true,
        }
    }
}

// ============================================================================
// Runner
// ============================================================================

/// A test selected for this run, with its ancestor chain.
struct Entry<'a> {
    chain: Vec<&'a SuiteNode>,
    /// Child index of each chain suite, root index first.
    position: Vec<usize>,
    test: &'a TestNode,
    /// Inside a skipped suite.
    skipped: bool,
}

/// Per-suite state while the suite is open.
struct OpenSuite<'a> {
    suite: &'a SuiteNode,
    spec: Spec,
    /// Index of the first result recorded after the suite was entered.
    first_result: usize,
    /// Set when a `before_all` of this suite or an ancestor failed.
    broken: Option<Failure>,
    /// The failure was inherited from an ancestor; this suite's own hooks
    /// never ran.
    inherited: bool,
}

/// Run every root suite and return the collected results.
pub fn run_tree(roots: &[SuiteNode], config: &RunConfig) -> RunReport {
    let start = Instant::now();
    let mut entries = Vec::new();
    for (index, root) in roots.iter().enumerate() {
        let mut position = vec![index];
        collect(root, &mut Vec::new(), &mut position, false, config, &mut entries);
    }
    debug!(tests = entries.len(), "starting run");

    let mut runner = Runner::default();
    for entry in &entries {
        if entry.skipped {
            // Ancestors above the first skipped suite still open and close.
            let live = entry.chain.iter().take_while(|s| !s.skipped).count();
            let steps = runner.scheduler.plan(&entry.chain[..live], true);
            runner.run_suite_steps(&steps);
            runner.results.push(result_for(entry, Status::Skipped));
            continue;
        }
        let steps = runner.scheduler.plan(&entry.chain, entry.test.pending);
        runner.run_test(entry, steps);
    }
    let closing = runner.scheduler.finish();
    runner.run_suite_steps(&closing);

    let report = RunReport {
        results: runner.results,
        elapsed: start.elapsed(),
    };
    debug!(summary = ?report.summary(), "run finished");
    report
}

/// Depth-first, pre-order flattening of the tree into run entries.
/// `position` already holds this suite's own index.
fn collect<'a>(
    suite: &'a SuiteNode,
    chain: &mut Vec<&'a SuiteNode>,
    position: &mut Vec<usize>,
    skipped: bool,
    config: &RunConfig,
    out: &mut Vec<Entry<'a>>,
) {
    let skipped = skipped || suite.skipped;
    chain.push(suite);
    for (index, child) in suite.children.iter().enumerate() {
        match child {
            Node::Suite(nested) => {
                position.push(index);
                collect(nested, chain, position, skipped, config, out);
                position.pop();
            }
            Node::Test(test) => {
                let path = join_path(chain.iter().map(|s| s.name()).chain([test.name()]));
                if config.matches(&path) {
                    out.push(Entry {
                        chain: chain.clone(),
                        position: position.clone(),
                        test,
                        skipped,
                    });
                }
            }
        }
    }
    chain.pop();
}

fn result_for(entry: &Entry<'_>, status: Status) -> ExecutionResult {
    let (suites, scope): (Vec<String>, Vec<usize>) = entry
        .chain
        .iter()
        .zip(&entry.position)
        .filter(|(s, _)| !s.name().is_empty())
        .map(|(s, &index)| (s.name().to_string(), index))
        .unzip();
    ExecutionResult {
        suites,
        scope,
        name: entry.test.name.clone(),
        status,
        failures: Vec::new(),
        duration: Duration::ZERO,
    }
}

fn suite_path(chain: &[&SuiteNode]) -> String {
    join_path(chain.iter().map(|s| s.name()))
}

/// Invoke one callback, turning a panic into its message.
fn invoke(callback: &Callback, spec: &Spec) -> Result<(), String> {
    catch_unwind(AssertUnwindSafe(|| callback(spec))).map_err(|payload| panic_message(payload.as_ref()))
}

#[derive(Default)]
struct Runner<'a> {
    scheduler: HookScheduler<'a>,
    open: Vec<OpenSuite<'a>>,
    results: Vec<ExecutionResult>,
}

impl<'a> Runner<'a> {
    fn run_test(&mut self, entry: &Entry<'a>, steps: Vec<Step<'a>>) {
        let (suite_steps, test_steps): (Vec<_>, Vec<_>) = steps
            .into_iter()
            .partition(|s| matches!(s, Step::Enter(_) | Step::Leave(_)));
        self.run_suite_steps(&suite_steps);

        let mut result = result_for(entry, Status::Pending);
        if entry.test.pending {
            debug!(test = %result.full_path(), "pending");
            self.results.push(result);
            return;
        }

        if let Some(broken) = self.open.iter().rev().find_map(|s| s.broken.clone()) {
            debug!(test = %result.full_path(), "not run: before_all failed");
            result.fail_with(broken);
            self.results.push(result);
            return;
        }

        let path = result.full_path();
        debug!(test = %path, "running");
        let spec = Spec::new(path.as_str());
        let started = Instant::now();
        let mut setup_failed = false;

        for step in test_steps {
            match step {
                Step::Each(kind @ HookKind::BeforeEach, suite) if !setup_failed => {
                    setup_failed = !run_each_hooks(kind, suite, &spec, &path);
                }
                Step::Each(HookKind::BeforeEach, _) => {}
                Step::Body if setup_failed => {
                    trace!(test = %path, "body skipped: before_each failed");
                }
                Step::Body => {
                    if let Err(message) = invoke(&entry.test.body, &spec) {
                        spec.push(Failure::TestBody {
                            path: path.clone(),
                            message,
                        });
                    }
                }
                Step::Each(kind, suite) => {
                    run_each_hooks(kind, suite, &spec, &path);
                }
                Step::Enter(_) | Step::Leave(_) => {}
            }
        }
        spec.restore_spies();

        result.duration = started.elapsed();
        result.failures = spec.take_failures();
        result.status = if result.failures.is_empty() {
            Status::Passed
        } else {
            Status::Failed
        };
        debug!(test = %path, status = %result.status, "finished");
        self.results.push(result);
    }

    fn run_suite_steps(&mut self, steps: &[Step<'a>]) {
        for step in steps {
            match *step {
                Step::Enter(suite) => self.enter(suite),
                Step::Leave(suite) => self.leave(suite),
                Step::Each(..) | Step::Body => {}
            }
        }
    }

    fn chain(&self) -> Vec<&'a SuiteNode> {
        self.open.iter().map(|s| s.suite).collect()
    }

    fn enter(&mut self, suite: &'a SuiteNode) {
        let mut chain = self.chain();
        chain.push(suite);
        let path = suite_path(&chain);
        debug!(suite = %path, "enter");

        let spec = Spec::new(path.as_str());
        let inherited = self.open.last().and_then(|s| s.broken.clone());
        let (broken, inherited) = match inherited {
            Some(failure) => (Some(failure), true),
            None => (
                run_all_hooks(HookKind::BeforeAll, suite, &spec, &path),
                false,
            ),
        };

        self.open.push(OpenSuite {
            suite,
            spec,
            first_result: self.results.len(),
            broken,
            inherited,
        });
    }

    fn leave(&mut self, suite: &'a SuiteNode) {
        let Some(state) = self.open.pop() else {
            return;
        };
        debug_assert!(std::ptr::eq(state.suite, suite));

        let mut chain = self.chain();
        chain.push(suite);
        let path = suite_path(&chain);
        debug!(suite = %path, "leave");

        if !state.inherited {
            if let Some(failure) = run_all_hooks(HookKind::AfterAll, suite, &state.spec, &path) {
                for result in &mut self.results[state.first_result..] {
                    if matches!(result.status, Status::Passed | Status::Failed) {
                        result.fail_with(failure.clone());
                    }
                }
            }
        }
        state.spec.restore_spies();
    }
}

/// Run one suite's `before_each`/`after_each` hooks against the test's
/// spec. Returns false if a hook panicked.
fn run_each_hooks(kind: HookKind, suite: &SuiteNode, spec: &Spec, path: &str) -> bool {
    let mut ok = true;
    for hook in suite.hooks(kind) {
        trace!(suite = suite.name(), hook = %kind, "hook");
        if let Err(message) = invoke(hook, spec) {
            warn!(test = path, hook = %kind, %message, "hook failed");
            spec.push(Failure::Hook {
                path: path.to_string(),
                hook: kind,
                message,
            });
            ok = false;
            if kind == HookKind::BeforeEach {
                break;
            }
        }
    }
    ok
}

/// Run a suite's `before_all` or `after_all` hooks against the suite spec.
/// Any panic or failed expectation becomes a single hook failure.
fn run_all_hooks(kind: HookKind, suite: &SuiteNode, spec: &Spec, path: &str) -> Option<Failure> {
    let mut messages = Vec::new();
    for hook in suite.hooks(kind) {
        trace!(suite = suite.name(), hook = %kind, "hook");
        if let Err(message) = invoke(hook, spec) {
            messages.push(message);
            if kind == HookKind::BeforeAll {
                break;
            }
        }
    }
    messages.extend(spec.take_failures().iter().map(|f| f.message().to_string()));

    if messages.is_empty() {
        return None;
    }
    let message = messages.join("; ");
    warn!(suite = path, hook = %kind, %message, "hook failed");
    Some(Failure::Hook {
        path: path.to_string(),
        hook: kind,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::build;
    use crate::value::{Function, Object, Value};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn run(root: SuiteNode) -> RunReport {
        run_tree(&[root], &RunConfig::default())
    }

    fn statuses(report: &RunReport) -> Vec<(String, Status)> {
        report
            .results
            .iter()
            .map(|r| (r.full_path(), r.status))
            .collect()
    }

    #[test]
    fn nested_before_each_counts_both_levels() {
        let counter = Rc::new(Cell::new(0));
        let seen = Rc::new(Cell::new(-1));
        let root = build(|ctx| {
            let c = Rc::clone(&counter);
            ctx.describe("A", |ctx| {
                let c1 = Rc::clone(&c);
                ctx.before_each(move |_| c1.set(c1.get() + 1));
                ctx.describe("B", |ctx| {
                    let c2 = Rc::clone(&c);
                    ctx.before_each(move |_| c2.set(c2.get() + 1));
                    let (c3, seen) = (Rc::clone(&c), Rc::clone(&seen));
                    ctx.it("sees both", move |spec| {
                        seen.set(c3.get());
                        spec.expect(c3.get()).to_be(2);
                    });
                });
            });
        });

        let report = run(root);
        assert_eq!(seen.get(), 2);
        assert_eq!(report.summary().passed, 1);
    }

    #[test]
    fn hooks_run_in_nesting_order() {
        let log = Rc::new(RefCell::new(Vec::<String>::new()));
        let push = |log: &Rc<RefCell<Vec<String>>>, s: &'static str| {
            let log = Rc::clone(log);
            move |_: &Spec| log.borrow_mut().push(s.to_string())
        };
        let root = build(|ctx| {
            ctx.describe("outer", |ctx| {
                ctx.before_all(push(&log, "outer.before_all"));
                ctx.before_each(push(&log, "outer.before_each"));
                ctx.after_each(push(&log, "outer.after_each"));
                ctx.after_all(push(&log, "outer.after_all"));
                ctx.it("t1", push(&log, "t1"));
                ctx.describe("inner", |ctx| {
                    ctx.before_all(push(&log, "inner.before_all"));
                    ctx.before_each(push(&log, "inner.before_each"));
                    ctx.after_each(push(&log, "inner.after_each"));
                    ctx.after_all(push(&log, "inner.after_all"));
                    ctx.it("t2", push(&log, "t2"));
                });
            });
        });

        run(root);
        assert_eq!(
            *log.borrow(),
            [
                "outer.before_all",
                "outer.before_each",
                "t1",
                "outer.after_each",
                "inner.before_all",
                "outer.before_each",
                "inner.before_each",
                "t2",
                "inner.after_each",
                "outer.after_each",
                "inner.after_all",
                "outer.after_all",
            ]
        );
    }

    #[test]
    fn after_all_fires_once_after_nested_suites() {
        let log = Rc::new(RefCell::new(Vec::<&'static str>::new()));
        let root = build(|ctx| {
            let l = Rc::clone(&log);
            ctx.describe("A", |ctx| {
                let la = Rc::clone(&l);
                ctx.after_all(move |_| la.borrow_mut().push("after_all"));
                let l1 = Rc::clone(&l);
                ctx.it("one", move |_| l1.borrow_mut().push("one"));
                ctx.describe("B", |ctx| {
                    let l2 = Rc::clone(&l);
                    ctx.it("two", move |_| l2.borrow_mut().push("two"));
                    let l3 = Rc::clone(&l);
                    ctx.it("three", move |_| l3.borrow_mut().push("three"));
                });
            });
        });
        run(root);
        assert_eq!(*log.borrow(), ["one", "two", "three", "after_all"]);
    }

    #[test]
    fn skipped_suites_run_nothing() {
        let ran = Rc::new(Cell::new(false));
        let root = build(|ctx| {
            let r = Rc::clone(&ran);
            ctx.xdescribe("Disabled", |ctx| {
                let (a, b, c) = (Rc::clone(&r), Rc::clone(&r), Rc::clone(&r));
                ctx.before_all(move |_| a.set(true));
                ctx.before_each(move |_| b.set(true));
                ctx.it("not pending but skipped", move |_| c.set(true));
                ctx.describe("nested", |ctx| {
                    ctx.it("also skipped", |_| panic!("never"));
                });
            });
        });
        let report = run(root);
        assert!(!ran.get());
        assert_eq!(
            statuses(&report),
            [
                ("Disabled > not pending but skipped".to_string(), Status::Skipped),
                ("Disabled > nested > also skipped".to_string(), Status::Skipped),
            ]
        );
    }

    #[test]
    fn pending_tests_do_not_run_but_siblings_do() {
        let each = Rc::new(Cell::new(0));
        let all = Rc::new(Cell::new(0));
        let root = build(|ctx| {
            let (e, a) = (Rc::clone(&each), Rc::clone(&all));
            ctx.describe("Suite", |ctx| {
                let a1 = Rc::clone(&a);
                ctx.before_all(move |_| a1.set(a1.get() + 1));
                let e1 = Rc::clone(&e);
                ctx.before_each(move |_| e1.set(e1.get() + 1));
                ctx.xit("Pending Test", |_| panic!("should never run"));
                ctx.it("active", |spec| {
                    spec.expect(true).to_be_truthy();
                });
            });
        });
        let report = run(root);
        assert_eq!(report.get("Suite > Pending Test").unwrap().status, Status::Pending);
        assert_eq!(report.get("Suite > active").unwrap().status, Status::Passed);
        assert_eq!(each.get(), 1);
        assert_eq!(all.get(), 1);
    }

    #[test]
    fn suite_with_only_pending_tests_still_runs_all_hooks() {
        let all = Rc::new(Cell::new(0));
        let root = build(|ctx| {
            let a = Rc::clone(&all);
            ctx.describe("Test suite not ignored", |ctx| {
                let (b, c) = (Rc::clone(&a), Rc::clone(&a));
                ctx.before_all(move |_| b.set(b.get() + 1));
                ctx.after_all(move |_| c.set(c.get() + 10));
                ctx.xit("Pending Test", |_| {});
            });
        });
        let report = run(root);
        assert_eq!(all.get(), 11);
        assert_eq!(report.summary().pending, 1);
    }

    #[test]
    fn suite_with_only_skipped_children_still_runs_all_hooks() {
        let all = Rc::new(Cell::new(0));
        let skipped_hook = Rc::new(Cell::new(false));
        let root = build(|ctx| {
            let (a, s) = (Rc::clone(&all), Rc::clone(&skipped_hook));
            ctx.describe("A", |ctx| {
                let (b, c) = (Rc::clone(&a), Rc::clone(&a));
                ctx.before_all(move |_| b.set(b.get() + 1));
                ctx.after_all(move |_| c.set(c.get() + 10));
                ctx.xdescribe("S", |ctx| {
                    let s = Rc::clone(&s);
                    ctx.before_all(move |_| s.set(true));
                    ctx.it("t", |_| panic!("never"));
                });
            });
        });
        let report = run(root);
        assert_eq!(all.get(), 11);
        assert!(!skipped_hook.get());
        assert_eq!(statuses(&report), [("A > S > t".to_string(), Status::Skipped)]);
    }

    #[test]
    fn assertion_and_body_failures_stay_local() {
        let root = build(|ctx| {
            ctx.describe("Matchers", |ctx| {
                ctx.it("toBeNull", |spec| {
                    spec.expect(Value::Null).to_be_null();
                    spec.expect("test").to_be_null();
                });
                ctx.it("panics", |_| panic!("exploded"));
                ctx.it("passes", |spec| {
                    spec.expect(0).to_equal(0);
                });
            });
        });
        let report = run(root);
        let null = report.get("Matchers > toBeNull").unwrap();
        assert_eq!(null.status, Status::Failed);
        assert_eq!(null.failures.len(), 1);
        assert!(matches!(null.failures[0], Failure::Assertion { .. }));

        let panics = report.get("Matchers > panics").unwrap();
        assert_eq!(
            panics.failures,
            [Failure::TestBody {
                path: "Matchers > panics".into(),
                message: "exploded".into(),
            }]
        );
        assert_eq!(report.get("Matchers > passes").unwrap().status, Status::Passed);
        assert_eq!(report.summary(), Summary { passed: 1, failed: 2, pending: 0, skipped: 0 });
    }

    #[test]
    fn before_each_panic_skips_body_but_runs_after_each() {
        let body = Rc::new(Cell::new(false));
        let after = Rc::new(Cell::new(false));
        let root = build(|ctx| {
            let (b, a) = (Rc::clone(&body), Rc::clone(&after));
            ctx.describe("S", |ctx| {
                ctx.before_each(|_| panic!("setup broke"));
                let a = Rc::clone(&a);
                ctx.after_each(move |_| a.set(true));
                let b = Rc::clone(&b);
                ctx.it("t", move |_| b.set(true));
                ctx.it("u", |_| {});
            });
        });
        let report = run(root);
        assert!(!body.get());
        assert!(after.get());
        for result in &report.results {
            assert_eq!(result.status, Status::Failed);
            assert!(matches!(
                result.failures[0],
                Failure::Hook { hook: HookKind::BeforeEach, .. }
            ));
        }
    }

    #[test]
    fn before_all_failure_fails_the_whole_subtree() {
        let ran = Rc::new(Cell::new(0));
        let after_all = Rc::new(Cell::new(false));
        let root = build(|ctx| {
            let (r, aa) = (Rc::clone(&ran), Rc::clone(&after_all));
            ctx.describe("Broken", |ctx| {
                ctx.before_all(|_| panic!("no database"));
                let aa = Rc::clone(&aa);
                ctx.after_all(move |_| aa.set(true));
                let r1 = Rc::clone(&r);
                ctx.it("one", move |_| r1.set(r1.get() + 1));
                ctx.describe("nested", |ctx| {
                    let r2 = Rc::clone(&r);
                    ctx.before_all(move |_| r2.set(r2.get() + 100));
                    ctx.it("two", |_| {});
                });
            });
            ctx.describe("Healthy", |ctx| {
                ctx.it("three", |_| {});
            });
        });
        let report = run(root);
        assert_eq!(ran.get(), 0);
        assert!(after_all.get());
        for path in ["Broken > one", "Broken > nested > two"] {
            let result = report.get(path).unwrap();
            assert_eq!(result.status, Status::Failed);
            assert_eq!(result.failures[0].message(), "no database");
            assert_eq!(result.failures[0].path(), "Broken");
        }
        assert_eq!(report.get("Healthy > three").unwrap().status, Status::Passed);
    }

    #[test]
    fn after_all_failure_flips_finished_tests() {
        let root = build(|ctx| {
            ctx.describe("Teardown", |ctx| {
                ctx.after_all(|_| panic!("cleanup failed"));
                ctx.it("ok", |_| {});
                ctx.xit("pending", |_| {});
            });
        });
        let report = run(root);
        let ok = report.get("Teardown > ok").unwrap();
        assert_eq!(ok.status, Status::Failed);
        assert!(matches!(
            &ok.failures[0],
            Failure::Hook { hook: HookKind::AfterAll, message, .. } if message == "cleanup failed"
        ));
        assert_eq!(report.get("Teardown > pending").unwrap().status, Status::Pending);
    }

    #[test]
    fn failed_expectation_in_before_all_is_a_hook_failure() {
        let root = build(|ctx| {
            ctx.describe("S", |ctx| {
                ctx.before_all(|spec| {
                    spec.expect(1).to_be(2);
                });
                ctx.it("t", |_| {});
            });
        });
        let report = run(root);
        let t = report.get("S > t").unwrap();
        assert!(matches!(&t.failures[0], Failure::Hook { hook: HookKind::BeforeAll, message, .. } if message == "Expected 1 to be 2."));
    }

    #[test]
    fn spies_from_before_all_live_for_the_suite() {
        let target = Object::new().with("getNumber", Function::new(|_| Ok(Value::Undefined)));
        let root = build(|ctx| {
            let t = target.clone();
            ctx.describe("Spies", |ctx| {
                let setup = t.clone();
                ctx.before_all(move |spec| {
                    spec.spy_on(&setup, "getNumber").unwrap();
                    setup.call("getNumber", &[3.into()]).unwrap();
                    setup.call("getNumber", &[333.into()]).unwrap();
                });
                let t1 = t.clone();
                ctx.it("called", move |spec| {
                    spec.expect(t1.get("getNumber")).to_have_been_called();
                });
                let t2 = t.clone();
                ctx.it("twice", move |spec| {
                    spec.expect(t2.get("getNumber")).to_have_been_called_times(2);
                });
                let t3 = t.clone();
                ctx.it("with 3", move |spec| {
                    spec.expect(t3.get("getNumber")).to_have_been_called_with([3]);
                });
            });
        });
        let report = run(root);
        assert_eq!(report.summary().passed, 3, "{:?}", report.failures().collect::<Vec<_>>());
        let restored = target.get("getNumber");
        assert!(restored.as_function().and_then(Function::spy).is_none());
    }

    #[test]
    fn spies_are_restored_after_a_panicking_test() {
        let target = Object::new().with("f", Function::new(|_| Ok(Value::from(1))));
        let root = build(|ctx| {
            let t = target.clone();
            ctx.it("spies then panics", move |spec| {
                spec.spy_on(&t, "f").unwrap();
                panic!("boom");
            });
        });
        let report = run(root);
        assert_eq!(report.results[0].status, Status::Failed);
        let out = target.call("f", &[]).unwrap();
        assert!(out.same_value(&1.into()));
    }

    #[test]
    fn filter_omits_unmatched_tests() {
        let root = build(|ctx| {
            ctx.describe("Math", |ctx| {
                ctx.it("adds", |_| {});
                ctx.it("subtracts", |_| panic!("filtered out"));
            });
        });
        let config = RunConfig::parse(["--nocapture".to_string(), "ADDS".to_string()]);
        let report = run_tree(&[root], &config);
        assert_eq!(statuses(&report), [("Math > adds".to_string(), Status::Passed)]);
    }

    #[test]
    fn parses_cargo_test_style_args() {
        let config = RunConfig::parse(["--list".to_string(), "--exact".to_string()]);
        assert!(config.list);
        assert!(config.filter.is_none());
        assert!(RunConfig::default().matches("anything"));
    }

    #[test]
    fn flag_values_are_not_taken_as_filters() {
        let args = ["--test-threads", "1", "--skip", "slow", "--color", "never"];
        let config = RunConfig::parse(args.map(String::from));
        assert!(config.filter.is_none());

        let config = RunConfig::parse(["--test-threads", "1", "adds"].map(String::from));
        assert_eq!(config.filter.as_deref(), Some("adds"));
    }

    #[test]
    fn top_level_tests_and_hooks_apply() {
        let count = Rc::new(Cell::new(0));
        let root = build(|ctx| {
            let c = Rc::clone(&count);
            ctx.before_each(move |_| c.set(c.get() + 1));
            ctx.it("top", |_| {});
            ctx.describe("S", |ctx| ctx.it("nested", |_| {}));
        });
        let report = run(root);
        assert_eq!(count.get(), 2);
        assert_eq!(report.results[0].full_path(), "top");
        assert_eq!(report.results[1].full_path(), "S > nested");
    }
}
