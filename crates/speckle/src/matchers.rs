//! Matcher engine — named comparison rules evaluated against dynamic values.
//!
//! Rules are addressed by their camelCase names (`"toBe"`, `"toBeCloseTo"`),
//! optionally prefixed with `not.` to invert the outcome:
//!
//! ```
//! use speckle::matchers::evaluate;
//! use speckle::Value;
//!
//! let outcome = evaluate("toBeCloseTo", &200.012.into(), Some(&200.013.into()), Some(2)).unwrap();
//! assert!(outcome.pass);
//!
//! let outcome = evaluate("not.toBe", &Value::from(0), Some(&Value::from(0)), None).unwrap();
//! assert!(!outcome.pass);
//! assert_eq!(outcome.message, "Expected 0 not to be 0.");
//! ```

use crate::value::{Raised, Value};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;

/// Precision used by `toBeCloseTo` when none is given.
pub const DEFAULT_PRECISION: i32 = 2;

/// A comparison rule.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum Rule {
    ToBe,
    ToEqual,
    ToMatch,
    ToBeDefined,
    ToBeUndefined,
    ToBeNull,
    ToBeTruthy,
    ToBeFalsy,
    ToContain,
    ToBeLessThan,
    ToBeGreaterThan,
    ToBeCloseTo,
    ToThrow,
    ToThrowError,
    ToHaveBeenCalled,
    ToHaveBeenCalledTimes,
    ToHaveBeenCalledWith,
}

impl Rule {
    /// Whether the rule compares against an expected value.
    pub fn takes_expected(self) -> bool {
        matches!(
            self,
            Rule::ToBe
                | Rule::ToEqual
                | Rule::ToMatch
                | Rule::ToContain
                | Rule::ToBeLessThan
                | Rule::ToBeGreaterThan
                | Rule::ToBeCloseTo
                | Rule::ToHaveBeenCalledTimes
                | Rule::ToHaveBeenCalledWith
        )
    }

    /// `toBeCloseTo` -> `to be close to`.
    pub fn words(self) -> String {
        let name: &'static str = self.into();
        let mut out = String::with_capacity(name.len() + 4);
        for ch in name.chars() {
            if ch.is_ascii_uppercase() {
                out.push(' ');
                out.push(ch.to_ascii_lowercase());
            } else {
                out.push(ch);
            }
        }
        out
    }
}

/// Errors that prevent a matcher from producing an outcome at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatcherError {
    #[error("unknown matcher `{0}`")]
    UnknownRule(String),
    #[error("{0} requires an expected value")]
    MissingExpected(Rule),
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("{rule} expects a function, but got {actual}")]
    NotAFunction { rule: Rule, actual: String },
    #[error("{rule} expects a spy, but got {actual}")]
    NotASpy { rule: Rule, actual: String },
}

/// A rule plus the negation modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Matcher {
    pub rule: Rule,
    pub negated: bool,
}

impl Matcher {
    pub fn new(rule: Rule) -> Self {
        Matcher {
            rule,
            negated: false,
        }
    }

    pub fn not(rule: Rule) -> Self {
        Matcher {
            rule,
            negated: true,
        }
    }
}

impl FromStr for Matcher {
    type Err = MatcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negated, name) = match s.strip_prefix("not.").or_else(|| s.strip_prefix("not ")) {
            Some(rest) => (true, rest.trim()),
            None => (false, s),
        };
        let rule = Rule::from_str(name).map_err(|_| MatcherError::UnknownRule(s.to_string()))?;
        Ok(Matcher { rule, negated })
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "not.{}", self.rule)
        } else {
            write!(f, "{}", self.rule)
        }
    }
}

/// Result of evaluating one matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherOutcome {
    pub pass: bool,
    pub matcher: Matcher,
    /// Explanation phrased for the failing case, e.g. `Expected 1 to be 2.`
    pub message: String,
}

/// Evaluate a rule by name.
///
/// `precision` is only read by `toBeCloseTo`. For `toHaveBeenCalledWith`
/// the expected value is the list of arguments.
pub fn evaluate(
    rule: &str,
    actual: &Value,
    expected: Option<&Value>,
    precision: Option<i32>,
) -> Result<MatcherOutcome, MatcherError> {
    rule.parse::<Matcher>()?
        .evaluate(actual, expected, precision)
}

impl Matcher {
    pub fn evaluate(
        &self,
        actual: &Value,
        expected: Option<&Value>,
        precision: Option<i32>,
    ) -> Result<MatcherOutcome, MatcherError> {
        let rule = self.rule;
        let undefined = Value::Undefined;
        let expected = match expected {
            Some(v) => v,
            None if rule.takes_expected() => return Err(MatcherError::MissingExpected(rule)),
            None => &undefined,
        };

        let (pass, message) = match rule {
            Rule::ToBe => (actual.same_value(expected), self.describe(actual, Some(expected))),
            Rule::ToEqual => (actual.deep_equals(expected), self.describe(actual, Some(expected))),
            Rule::ToMatch => (matches_pattern(actual, expected)?, self.describe(actual, Some(expected))),
            Rule::ToBeDefined => (!actual.is_undefined(), self.describe(actual, None)),
            Rule::ToBeUndefined => (actual.is_undefined(), self.describe(actual, None)),
            Rule::ToBeNull => (actual.is_null(), self.describe(actual, None)),
            Rule::ToBeTruthy => (actual.is_truthy(), self.describe(actual, None)),
            Rule::ToBeFalsy => (!actual.is_truthy(), self.describe(actual, None)),
            Rule::ToContain => (contains(actual, expected), self.describe(actual, Some(expected))),
            Rule::ToBeLessThan => (
                compare(actual, expected, |a, e| a < e),
                self.describe(actual, Some(expected)),
            ),
            Rule::ToBeGreaterThan => (
                compare(actual, expected, |a, e| a > e),
                self.describe(actual, Some(expected)),
            ),
            Rule::ToBeCloseTo => {
                let precision = precision.unwrap_or(DEFAULT_PRECISION);
                let pass = match (actual.as_number(), expected.as_number()) {
                    (Some(a), Some(e)) => is_close(a, e, precision),
                    _ => false,
                };
                let not = if self.negated { "not " } else { "" };
                let message = format!("Expected {actual} {not}to be close to {expected}, {precision}.");
                (pass, message)
            }
            Rule::ToThrow | Rule::ToThrowError => self.evaluate_throw(actual)?,
            Rule::ToHaveBeenCalled | Rule::ToHaveBeenCalledTimes | Rule::ToHaveBeenCalledWith => {
                self.evaluate_spy(actual, expected)?
            }
        };

        Ok(MatcherOutcome {
            pass: pass != self.negated,
            matcher: *self,
            message,
        })
    }

    /// `Expected <actual> [not ]to <rule words>[ <expected>].`
    fn describe(&self, actual: &Value, expected: Option<&Value>) -> String {
        let not = if self.negated { "not " } else { "" };
        let words = self.rule.words();
        match expected {
            Some(expected) => format!("Expected {actual} {not}{words} {expected}."),
            None => format!("Expected {actual} {not}{words}."),
        }
    }

    fn evaluate_throw(&self, actual: &Value) -> Result<(bool, String), MatcherError> {
        let function = actual.as_function().ok_or_else(|| MatcherError::NotAFunction {
            rule: self.rule,
            actual: actual.to_string(),
        })?;
        let raised = raise_boundary(|| function.call(&[]));
        let wants_error = self.rule == Rule::ToThrowError;
        let what = if wants_error { "an Error" } else { "an exception" };

        let pass = match &raised {
            Some(raised) => !wants_error || raised.is_error(),
            None => false,
        };
        let message = match (&raised, self.negated) {
            (None, _) => format!("Expected function to throw {what}."),
            (Some(raised), false) => format!("Expected function to throw {what}, but it threw {raised}."),
            (Some(raised), true) => format!("Expected function not to throw {what}, but it threw {raised}."),
        };
        Ok((pass, message))
    }

    fn evaluate_spy(&self, actual: &Value, expected: &Value) -> Result<(bool, String), MatcherError> {
        let spy = actual
            .as_function()
            .and_then(|f| f.spy())
            .ok_or_else(|| MatcherError::NotASpy {
                rule: self.rule,
                actual: actual.to_string(),
            })?;
        let not = if self.negated { "not " } else { "" };
        let count = spy.call_count();
        let name = spy.method().to_string();

        let outcome = match self.rule {
            Rule::ToHaveBeenCalled => (
                spy.was_called(),
                format!("Expected spy {name} {not}to have been called."),
            ),
            Rule::ToHaveBeenCalledTimes => {
                let wanted = expected.as_number().unwrap_or(f64::NAN);
                (
                    count as f64 == wanted,
                    format!(
                        "Expected spy {name} {not}to have been called {expected} times. It was called {count} times."
                    ),
                )
            }
            _ => {
                let args: Vec<Value> = match expected {
                    Value::List(items) => items.as_ref().clone(),
                    single => vec![single.clone()],
                };
                let calls = spy
                    .calls()
                    .iter()
                    .map(|call| Value::list(call.iter().cloned()).to_string())
                    .collect::<Vec<_>>();
                let shown = if calls.is_empty() {
                    "it was never called".to_string()
                } else {
                    format!("actual calls were {}", calls.join(", "))
                };
                (
                    spy.was_called_with(&args),
                    format!(
                        "Expected spy {name} {not}to have been called with {}, but {shown}.",
                        Value::from(args.clone())
                    ),
                )
            }
        };
        Ok(outcome)
    }
}

/// Run `f` and report what it raised, counting a panic as a typed error.
pub(crate) fn raise_boundary(f: impl FnOnce() -> Result<Value, Raised>) -> Option<Raised> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(_)) => None,
        Ok(Err(raised)) => Some(raised),
        Err(payload) => Some(Raised::error(
            "panic",
            crate::error::panic_message(payload.as_ref()),
        )),
    }
}

fn matches_pattern(actual: &Value, expected: &Value) -> Result<bool, MatcherError> {
    let pattern = match expected {
        Value::Str(p) => p,
        other => {
            return Err(MatcherError::InvalidPattern {
                pattern: other.to_string(),
                reason: "pattern must be a string".to_string(),
            })
        }
    };
    let re = regex::Regex::new(pattern).map_err(|e| MatcherError::InvalidPattern {
        pattern: pattern.clone(),
        reason: e.to_string(),
    })?;
    Ok(actual.as_str().is_some_and(|s| re.is_match(s)))
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Str(haystack), Value::Str(needle)) => haystack.contains(needle.as_str()),
        (Value::List(items), needle) => items.iter().any(|item| item.deep_equals(needle)),
        _ => false,
    }
}

fn compare(actual: &Value, expected: &Value, op: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.as_number(), expected.as_number()) {
        (Some(a), Some(e)) => op(a, e),
        _ => false,
    }
}

/// `|actual - expected| < 10^-precision / 2`
fn is_close(actual: f64, expected: f64, precision: i32) -> bool {
    if actual == expected {
        return true;
    }
    (actual - expected).abs() < 10f64.powi(-precision) / 2.0
}
