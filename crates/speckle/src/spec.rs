//! `Spec` — the handle a test body or hook receives.
//!
//! A spec collects failed expectations, owns the spies created in its scope,
//! and restores those spies when the scope ends.

use crate::error::Failure;
use crate::matchers::{Matcher, MatcherOutcome, Rule};
use crate::spy::{SpyError, SpyHandle, SpyRegistry};
use crate::value::{Object, Value};
use std::cell::RefCell;
use tracing::trace;

/// Per-scope state for one test (or one suite, for `before_all`/`after_all`).
pub struct Spec {
    path: String,
    failures: RefCell<Vec<Failure>>,
    spies: SpyRegistry,
}

impl Spec {
    pub(crate) fn new(path: impl Into<String>) -> Self {
        Spec {
            path: path.into(),
            failures: RefCell::new(Vec::new()),
            spies: SpyRegistry::new(),
        }
    }

    /// Full path of the test or suite this spec belongs to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Start an expectation on `actual`.
    ///
    /// ```
    /// # let root = speckle::build(|ctx| {
    /// ctx.it("adds", |spec| {
    ///     spec.expect(2 + 3).to_be(5);
    ///     spec.expect("test").not().to_be_null();
    /// });
    /// # });
    /// ```
    pub fn expect(&self, actual: impl Into<Value>) -> Expectation<'_> {
        Expectation {
            spec: self,
            actual: actual.into(),
            negated: false,
        }
    }

    /// Replace `target[method]` with a recording stub, restored when this
    /// scope ends.
    pub fn spy_on(&self, target: &Object, method: &str) -> Result<SpyHandle, SpyError> {
        self.spies.spy_on(target, method)
    }

    /// Record an explicit failure.
    pub fn fail(&self, message: impl Into<String>) {
        self.push(Failure::Assertion {
            path: self.path.clone(),
            message: message.into(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.borrow().is_empty()
    }

    pub fn failures(&self) -> Vec<Failure> {
        self.failures.borrow().clone()
    }

    pub(crate) fn push(&self, failure: Failure) {
        self.failures.borrow_mut().push(failure);
    }

    pub(crate) fn take_failures(&self) -> Vec<Failure> {
        std::mem::take(&mut *self.failures.borrow_mut())
    }

    pub(crate) fn restore_spies(&self) {
        self.spies.restore_all();
    }

    fn record(&self, matcher: Matcher, actual: &Value, expected: Option<&Value>, precision: Option<i32>) -> bool {
        match matcher.evaluate(actual, expected, precision) {
            Ok(MatcherOutcome { pass: true, .. }) => {
                trace!(path = %self.path, %matcher, "expectation passed");
                true
            }
            Ok(outcome) => {
                trace!(path = %self.path, %matcher, "expectation failed");
                self.fail(outcome.message);
                false
            }
            Err(err) => {
                self.fail(err.to_string());
                false
            }
        }
    }
}

/// A pending assertion on one value. Each matcher method evaluates, records
/// a failure on the owning [`Spec`] if it does not hold, and returns whether
/// it held.
pub struct Expectation<'a> {
    spec: &'a Spec,
    actual: Value,
    negated: bool,
}

impl Expectation<'_> {
    /// Invert the next matcher.
    #[allow(clippy::should_implement_trait)]
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    fn check(self, rule: Rule, expected: Option<Value>, precision: Option<i32>) -> bool {
        let matcher = Matcher {
            rule,
            negated: self.negated,
        };
        self.spec
            .record(matcher, &self.actual, expected.as_ref(), precision)
    }

    /// Identity: equal primitives, or the same list/object/function.
    pub fn to_be(self, expected: impl Into<Value>) -> bool {
        self.check(Rule::ToBe, Some(expected.into()), None)
    }

    /// Deep structural equality.
    pub fn to_equal(self, expected: impl Into<Value>) -> bool {
        self.check(Rule::ToEqual, Some(expected.into()), None)
    }

    /// The actual string matches the regular expression `pattern`.
    pub fn to_match(self, pattern: &str) -> bool {
        self.check(Rule::ToMatch, Some(pattern.into()), None)
    }

    pub fn to_be_defined(self) -> bool {
        self.check(Rule::ToBeDefined, None, None)
    }

    pub fn to_be_undefined(self) -> bool {
        self.check(Rule::ToBeUndefined, None, None)
    }

    pub fn to_be_null(self) -> bool {
        self.check(Rule::ToBeNull, None, None)
    }

    pub fn to_be_truthy(self) -> bool {
        self.check(Rule::ToBeTruthy, None, None)
    }

    pub fn to_be_falsy(self) -> bool {
        self.check(Rule::ToBeFalsy, None, None)
    }

    /// Substring for strings, deep-equal element for lists.
    pub fn to_contain(self, expected: impl Into<Value>) -> bool {
        self.check(Rule::ToContain, Some(expected.into()), None)
    }

    pub fn to_be_less_than(self, expected: impl Into<Value>) -> bool {
        self.check(Rule::ToBeLessThan, Some(expected.into()), None)
    }

    pub fn to_be_greater_than(self, expected: impl Into<Value>) -> bool {
        self.check(Rule::ToBeGreaterThan, Some(expected.into()), None)
    }

    /// `|actual - expected| < 10^-precision / 2`.
    pub fn to_be_close_to(self, expected: f64, precision: i32) -> bool {
        self.check(Rule::ToBeCloseTo, Some(expected.into()), Some(precision))
    }

    pub fn to_throw(self) -> bool {
        self.check(Rule::ToThrow, None, None)
    }

    /// Like [`to_throw`](Self::to_throw), but only a typed error counts.
    pub fn to_throw_error(self) -> bool {
        self.check(Rule::ToThrowError, None, None)
    }

    pub fn to_have_been_called(self) -> bool {
        self.check(Rule::ToHaveBeenCalled, None, None)
    }

    pub fn to_have_been_called_times(self, times: usize) -> bool {
        self.check(Rule::ToHaveBeenCalledTimes, Some(times.into()), None)
    }

    /// Some recorded call's arguments deep-equal `args`.
    pub fn to_have_been_called_with<I, T>(self, args: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.check(Rule::ToHaveBeenCalledWith, Some(Value::list(args)), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Function, Raised};

    #[test]
    fn passing_expectations_record_nothing() {
        let spec = Spec::new("Matchers > toBe");
        assert!(spec.expect(0).to_be(0));
        assert!(spec.expect("test").to_match("t."));
        assert!(spec.expect(200.012).to_be_close_to(200.033, 1));
        assert!(!spec.has_failures());
    }

    #[test]
    fn failing_expectations_accumulate_in_order() {
        let spec = Spec::new("Matchers > toBeNull");
        assert!(spec.expect(Value::Null).to_be_null());
        assert!(!spec.expect("test").to_be_null());
        assert!(!spec.expect(Value::Null).to_be_truthy());

        let failures = spec.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].message(), "Expected 'test' to be null.");
        assert_eq!(failures[1].message(), "Expected null to be truthy.");
        assert_eq!(failures[0].path(), "Matchers > toBeNull");
    }

    #[test]
    fn not_inverts() {
        let spec = Spec::new("t");
        assert!(spec.expect(1).not().to_be(0));
        assert!(!spec.expect(0).not().to_be(0));
        assert_eq!(spec.failures()[0].message(), "Expected 0 not to be 0.");
    }

    #[test]
    fn matcher_errors_become_failures() {
        let spec = Spec::new("t");
        assert!(!spec.expect(1).to_throw());
        assert!(spec.failures()[0].message().contains("expects a function"));
    }

    #[test]
    fn throw_matchers() {
        let spec = Spec::new("t");
        assert!(spec.expect(Function::new(|_| Err(Raised::value(0)))).to_throw());
        assert!(spec
            .expect(Function::new(|_| Err(Raised::error("Error", "oops!"))))
            .to_throw_error());
        assert!(!spec.has_failures());
    }

    #[test]
    fn spies_are_restored_with_the_scope() {
        let target = Object::new().with("getNumber", Function::new(|args| Ok(args[0].clone())));
        {
            let spec = Spec::new("t");
            spec.spy_on(&target, "getNumber").unwrap();
            target.call("getNumber", &[3.into()]).unwrap();
            target.call("getNumber", &[333.into()]).unwrap();

            let stub = target.get("getNumber");
            assert!(spec.expect(&stub).to_have_been_called());
            assert!(spec.expect(&stub).to_have_been_called_times(2));
            assert!(spec.expect(&stub).to_have_been_called_with([3]));
            assert!(spec.expect(&stub).not().to_have_been_called_with([4]));
            assert!(!spec.has_failures());
        }
        let out = target.call("getNumber", &[9.into()]).unwrap();
        assert!(out.same_value(&9.into()));
    }
}
