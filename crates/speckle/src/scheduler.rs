//! Hook scheduling — which hooks run around each test, and in what order.
//!
//! The runner hands tests to the [`HookScheduler`] one at a time, in
//! depth-first order, together with their ancestor chain. The scheduler
//! remembers which suites are open and answers with a [`Step`] plan:
//!
//! ```text
//! leave (after_all)   suites no longer on the chain, innermost first
//! enter (before_all)  chain suites not yet open, outermost first
//! before_each         every ancestor, outermost first
//! body
//! after_each          every ancestor, innermost first
//! ```
//!
//! Pending tests still enter their ancestors but get no per-test steps.

use crate::suite::{HookKind, SuiteNode};
use std::fmt;

/// One entry of an invocation plan.
#[derive(Clone, Copy)]
pub enum Step<'a> {
    /// Open a suite: run its `before_all` hooks.
    Enter(&'a SuiteNode),
    /// Run a suite's `before_each` or `after_each` hooks.
    Each(HookKind, &'a SuiteNode),
    /// Run the test body.
    Body,
    /// Close a suite: run its `after_all` hooks.
    Leave(&'a SuiteNode),
}

impl fmt::Debug for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Enter(s) => write!(f, "Enter({:?})", s.name()),
            Step::Each(kind, s) => write!(f, "{kind}({:?})", s.name()),
            Step::Body => f.write_str("Body"),
            Step::Leave(s) => write!(f, "Leave({:?})", s.name()),
        }
    }
}

/// Tracks open suites across a run.
#[derive(Default)]
pub struct HookScheduler<'a> {
    open: Vec<&'a SuiteNode>,
}

impl<'a> HookScheduler<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suites currently open, outermost first.
    pub fn open_suites(&self) -> &[&'a SuiteNode] {
        &self.open
    }

    /// Plan the steps for one test whose ancestors are `chain` (root first).
    pub fn plan(&mut self, chain: &[&'a SuiteNode], pending: bool) -> Vec<Step<'a>> {
        let shared = self
            .open
            .iter()
            .zip(chain)
            .take_while(|(open, wanted)| std::ptr::eq(**open, **wanted))
            .count();

        let mut steps = Vec::new();
        while self.open.len() > shared {
            if let Some(suite) = self.open.pop() {
                steps.push(Step::Leave(suite));
            }
        }
        for &suite in &chain[shared..] {
            self.open.push(suite);
            steps.push(Step::Enter(suite));
        }

        if !pending {
            steps.extend(chain.iter().map(|s| Step::Each(HookKind::BeforeEach, *s)));
            steps.push(Step::Body);
            steps.extend(chain.iter().rev().map(|s| Step::Each(HookKind::AfterEach, *s)));
        }
        steps
    }

    /// Close every suite still open, innermost first.
    pub fn finish(&mut self) -> Vec<Step<'a>> {
        self.open.drain(..).rev().map(Step::Leave).collect()
    }
}
