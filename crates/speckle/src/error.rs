//! Failure taxonomy recorded against tests.

use crate::suite::HookKind;
use std::any::Any;

/// A failure recorded against a test or suite. Failures are collected into
/// the run report; they never abort the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    /// A matcher evaluated false (or could not be evaluated).
    #[error("{path}: {message}")]
    Assertion { path: String, message: String },
    /// A hook panicked or recorded a failed expectation.
    #[error("{path}: {hook} failed: {message}")]
    Hook {
        path: String,
        hook: HookKind,
        message: String,
    },
    /// A test body panicked.
    #[error("{path}: {message}")]
    TestBody { path: String, message: String },
}

impl Failure {
    /// Path of the node the failure originated from.
    pub fn path(&self) -> &str {
        match self {
            Failure::Assertion { path, .. }
            | Failure::Hook { path, .. }
            | Failure::TestBody { path, .. } => path,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Failure::Assertion { message, .. }
            | Failure::Hook { message, .. }
            | Failure::TestBody { message, .. } => message,
        }
    }

    pub fn is_hook(&self) -> bool {
        matches!(self, Failure::Hook { .. })
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::catch_unwind;

    #[test]
    fn extracts_panic_messages() {
        let payload = catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");

        let payload = catch_unwind(|| std::panic::panic_any(7u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn hook_failures_name_the_hook() {
        let failure = Failure::Hook {
            path: "Suite".into(),
            hook: HookKind::BeforeAll,
            message: "db down".into(),
        };
        assert_eq!(failure.to_string(), "Suite: before_all failed: db down");
        assert!(failure.is_hook());
        assert_eq!(failure.message(), "db down");
    }
}
