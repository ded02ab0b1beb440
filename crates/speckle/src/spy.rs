//! Spies — recording stand-ins for functions stored on an [`Object`].
//!
//! [`install`] swaps the named property for a stub that records every call.
//! The original is kept on the [`SpyRecord`] and put back by
//! [`SpyHandle::restore`], which the owning [`SpyRegistry`] calls when its
//! scope ends.

use crate::value::{Function, Object, Value, WeakObject};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Errors from installing a spy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpyError {
    #[error("{0}() method does not exist")]
    MissingMethod(String),
    #[error("{method} is not a function (found {found})")]
    NotAFunction { method: String, found: &'static str },
    #[error("{0} has already been spied upon")]
    AlreadySpied(String),
}

/// What the stub does after recording a call.
#[derive(Clone, Default)]
enum Strategy {
    #[default]
    Stub,
    CallThrough,
    Return(Value),
}

/// Call history and restoration state for one spied method.
pub struct SpyRecord {
    target: WeakObject,
    method: String,
    original: RefCell<Option<Function>>,
    calls: RefCell<Vec<Vec<Value>>>,
    strategy: RefCell<Strategy>,
    restored: Cell<bool>,
}

impl SpyRecord {
    pub(crate) fn method(&self) -> &str {
        &self.method
    }

    fn invoke(&self, args: &[Value]) -> Result<Value, crate::value::Raised> {
        trace!(method = %self.method, args = args.len(), "spy called");
        self.calls.borrow_mut().push(args.to_vec());
        let strategy = self.strategy.borrow().clone();
        match strategy {
            Strategy::Stub => Ok(Value::Undefined),
            Strategy::Return(value) => Ok(value),
            Strategy::CallThrough => {
                let original = self.original.borrow().clone();
                match original {
                    Some(original) => original.call(args),
                    None => Ok(Value::Undefined),
                }
            }
        }
    }
}

/// Replace `target[method]` with a recording stub.
pub fn install(target: &Object, method: &str) -> Result<SpyHandle, SpyError> {
    let original = match target.get(method) {
        Value::Function(f) => f,
        Value::Undefined if !target.contains_key(method) => {
            return Err(SpyError::MissingMethod(method.to_string()));
        }
        other => {
            return Err(SpyError::NotAFunction {
                method: method.to_string(),
                found: other.type_name(),
            });
        }
    };

    if original.spy_record().is_some_and(|r| !r.restored.get()) {
        return Err(SpyError::AlreadySpied(method.to_string()));
    }

    let record = Rc::new(SpyRecord {
        target: target.downgrade(),
        method: method.to_string(),
        original: RefCell::new(Some(original)),
        calls: RefCell::new(Vec::new()),
        strategy: RefCell::new(Strategy::default()),
        restored: Cell::new(false),
    });

    let recorder = Rc::clone(&record);
    let stub = Function::spied(move |args| recorder.invoke(args), Rc::clone(&record));
    target.set(method, stub);
    trace!(method, "spy installed");

    Ok(SpyHandle { record })
}

/// Query and control handle for an installed spy.
#[derive(Clone)]
pub struct SpyHandle {
    record: Rc<SpyRecord>,
}

impl fmt::Debug for SpyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpyHandle")
            .field("method", &self.method())
            .field("calls", &self.call_count())
            .field("restored", &self.is_restored())
            .finish()
    }
}

impl SpyHandle {
    pub(crate) fn from_record(record: Rc<SpyRecord>) -> Self {
        SpyHandle { record }
    }

    pub fn method(&self) -> &str {
        &self.record.method
    }

    pub fn was_called(&self) -> bool {
        self.call_count() > 0
    }

    pub fn call_count(&self) -> usize {
        self.record.calls.borrow().len()
    }

    /// True if some recorded call's arguments deep-equal `args`.
    pub fn was_called_with(&self, args: &[Value]) -> bool {
        self.record.calls.borrow().iter().any(|call| {
            call.len() == args.len() && call.iter().zip(args).all(|(a, b)| a.deep_equals(b))
        })
    }

    /// Argument lists of every call, oldest first.
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.record.calls.borrow().clone()
    }

    pub fn most_recent_call(&self) -> Option<Vec<Value>> {
        self.record.calls.borrow().last().cloned()
    }

    /// Forget recorded calls.
    pub fn reset(&self) {
        self.record.calls.borrow_mut().clear();
    }

    /// Forward calls to the original function after recording them.
    pub fn and_call_through(&self) -> &Self {
        *self.record.strategy.borrow_mut() = Strategy::CallThrough;
        self
    }

    /// Return `value` from every call.
    pub fn and_return(&self, value: impl Into<Value>) -> &Self {
        *self.record.strategy.borrow_mut() = Strategy::Return(value.into());
        self
    }

    /// The stub currently standing in for the method.
    pub fn stub(&self) -> Option<Value> {
        let target = self.record.target.upgrade()?;
        Some(target.get(&self.record.method))
    }

    pub fn is_restored(&self) -> bool {
        self.record.restored.get()
    }

    /// Put the original function back. Later calls are no-ops.
    pub fn restore(&self) {
        if self.record.restored.replace(true) {
            return;
        }
        let original = self.record.original.borrow_mut().take();
        if let (Some(target), Some(original)) = (self.record.target.upgrade(), original) {
            target.set(self.record.method.as_str(), original);
        }
        trace!(method = %self.record.method, calls = self.call_count(), "spy restored");
    }
}

/// Spies owned by one scope. Dropping the registry restores them.
#[derive(Default)]
pub struct SpyRegistry {
    spies: RefCell<Vec<SpyHandle>>,
}

impl SpyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spy_on(&self, target: &Object, method: &str) -> Result<SpyHandle, SpyError> {
        let handle = install(target, method)?;
        self.spies.borrow_mut().push(handle.clone());
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.spies.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.spies.borrow().is_empty()
    }

    /// Restore every spy, newest first.
    pub fn restore_all(&self) {
        let spies: Vec<SpyHandle> = self.spies.borrow_mut().drain(..).collect();
        for spy in spies.iter().rev() {
            spy.restore();
        }
    }
}

impl Drop for SpyRegistry {
    fn drop(&mut self) {
        self.restore_all();
    }
}
