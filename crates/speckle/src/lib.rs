//! # speckle — a small behavior-driven test harness
//!
//! Declare nested suites with `describe`/`context`, tests with `it`,
//! lifecycle hooks, and write assertions with `expect(..)` matchers and
//! method spies.
//!
//! ## Quick example
//!
//! ```rust,no_run
//! use speckle::{Function, Object};
//!
//! fn main() {
//!     speckle::run(|ctx| {
//!         ctx.describe("Calculator", |ctx| {
//!             ctx.it("adds two numbers", |spec| {
//!                 spec.expect(2 + 3).to_be(5);
//!             });
//!
//!             ctx.context("with spies", |ctx| {
//!                 ctx.it("records calls", |spec| {
//!                     let person = Object::new()
//!                         .with("getNumber", Function::new(|args| Ok(args[0].clone())));
//!                     let spy = spec.spy_on(&person, "getNumber").unwrap();
//!                     person.call("getNumber", &[3.into()]).unwrap();
//!                     spec.expect(spy.stub()).to_have_been_called_with([3]);
//!                 });
//!             });
//!         });
//!     });
//! }
//! ```
//!
//! ## Features
//!
//! - `macros` (default) — the `suite!` and `spec_main!` declaration DSL

pub mod error;
pub mod matchers;
pub mod report;
pub mod runner;
pub mod scheduler;
pub mod spy;
pub mod suite;
pub mod value;
mod context;
mod spec;

pub use context::{build, run, run_suite, Context};
pub use error::Failure;
pub use matchers::{evaluate, Matcher, MatcherError, MatcherOutcome, Rule};
pub use spec::{Expectation, Spec};
pub use spy::{SpyError, SpyHandle};
pub use suite::{HookKind, Node, SuiteNode, TestNode};
pub use value::{Function, Object, Raised, Value};

#[cfg(feature = "macros")]
pub use speckle_macros::{spec_main, suite};

use tracing_subscriber::EnvFilter;

/// A drop guard that runs cleanup code even if the enclosing code panics.
pub struct Guard<F: FnOnce()> {
    f: Option<F>,
}

impl<F: FnOnce()> Guard<F> {
    pub fn new(f: F) -> Self {
        Guard { f: Some(f) }
    }
}

impl<F: FnOnce()> Drop for Guard<F> {
    fn drop(&mut self) {
        if let Some(f) = self.f.take() {
            f();
        }
    }
}

/// Install a `tracing` subscriber filtered by the `SPECKLE_LOG` env var
/// (default `warn`). Safe to call more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("SPECKLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    // Another subscriber may already be installed by the host binary.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
