//! Dynamic values inspected by matchers and passed through spied functions.
//!
//! `Value` models the handful of shapes a behavior test compares: the two
//! "no value" sentinels, primitives, and three reference kinds (`List`,
//! `Object`, `Function`) whose identity matters to [`Value::same_value`].

use crate::spy::{SpyHandle, SpyRecord};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

const MAX_RENDER_DEPTH: usize = 8;

type Props = RefCell<IndexMap<String, Value>>;
type NativeFn = dyn Fn(&[Value]) -> Result<Value, Raised>;

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    /// The "no value" sentinel.
    #[default]
    Undefined,
    /// The explicit null sentinel, distinct from `Undefined`.
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Rc<Vec<Value>>),
    Object(Object),
    Function(Function),
}

impl Value {
    /// Build a list value from anything convertible into values.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::List(Rc::new(items.into_iter().map(Into::into).collect()))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Boolean coercion: `false`, `0`, `-0`, `""`, null, undefined and NaN
    /// are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !(n.is_nan() || *n == 0.0),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Identity comparison.
    ///
    /// Primitives compare by value with SameValue number semantics (NaN is
    /// NaN, `0` is not `-0`). Lists, objects and functions compare by
    /// reference.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => same_number(*a, *b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Structural comparison: lists element-wise, objects by key set and
    /// per-key deep equality. Functions still compare by reference.
    ///
    /// Cyclic objects are supported: a pair of objects already being
    /// compared further up the recursion counts as equal.
    pub fn deep_equals(&self, other: &Value) -> bool {
        self.deep_equals_in(other, &mut Vec::new())
    }

    fn deep_equals_in(&self, other: &Value, seen: &mut Vec<(ObjectId, ObjectId)>) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b)
                    || (a.len() == b.len()
                        && a.iter().zip(b.iter()).all(|(x, y)| x.deep_equals_in(y, seen)))
            }
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b) || a.deep_equals_in(b, seen),
            _ => self.same_value(other),
        }
    }
}

fn same_number(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    a == b && a.is_sign_negative() == b.is_sign_negative()
}

// ============================================================================
// Object — shared, mutable property bag
// ============================================================================

/// A shared property bag. Cloning an `Object` clones the handle, not the
/// properties, so a spy installed through one handle is visible through all.
#[derive(Clone, Default)]
pub struct Object {
    props: Rc<Props>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Read a property; missing properties read as `Undefined`.
    pub fn get(&self, key: &str) -> Value {
        self.props.borrow().get(key).cloned().unwrap_or_default()
    }

    /// Write a property, returning the previous value if there was one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.props.borrow_mut().insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.props.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.props.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.borrow().is_empty()
    }

    /// Invoke the function stored under `method`.
    ///
    /// Calls always go through the property, so a spy installed on this
    /// object intercepts them.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value, Raised> {
        // The property is cloned out first: the callee may write to this object.
        match self.get(method) {
            Value::Function(f) => f.call(args),
            other => Err(Raised::error(
                "TypeError",
                format!("{method} is not a function (found {})", other.type_name()),
            )),
        }
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.props, &other.props)
    }

    pub(crate) fn downgrade(&self) -> WeakObject {
        WeakObject(Rc::downgrade(&self.props))
    }

    fn id(&self) -> ObjectId {
        Rc::as_ptr(&self.props) as *const ()
    }

    fn deep_equals_in(&self, other: &Object, seen: &mut Vec<(ObjectId, ObjectId)>) -> bool {
        let pair = (self.id(), other.id());
        if seen.contains(&pair) {
            return true;
        }
        seen.push(pair);
        let equal = {
            let a = self.props.borrow();
            let b = other.props.borrow();
            a.len() == b.len()
                && a.iter().all(|(key, value)| {
                    b.get(key).is_some_and(|other| value.deep_equals_in(other, seen))
                })
        };
        seen.pop();
        equal
    }
}

/// Address of an object's property bag, used to detect cycles.
type ObjectId = *const ();

/// Non-owning handle to an [`Object`], held by spies.
pub(crate) struct WeakObject(Weak<Props>);

impl WeakObject {
    pub(crate) fn upgrade(&self) -> Option<Object> {
        self.0.upgrade().map(|props| Object { props })
    }
}

// ============================================================================
// Function
// ============================================================================

/// A callable value. Spy stubs are functions that also carry their record.
#[derive(Clone)]
pub struct Function {
    body: Rc<NativeFn>,
    spy: Option<Rc<SpyRecord>>,
}

impl Function {
    pub fn new(body: impl Fn(&[Value]) -> Result<Value, Raised> + 'static) -> Self {
        Function {
            body: Rc::new(body),
            spy: None,
        }
    }

    pub(crate) fn spied(
        body: impl Fn(&[Value]) -> Result<Value, Raised> + 'static,
        record: Rc<SpyRecord>,
    ) -> Self {
        Function {
            body: Rc::new(body),
            spy: Some(record),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, Raised> {
        (self.body)(args)
    }

    /// The spy installed as this function, if it is a spy stub.
    pub fn spy(&self) -> Option<SpyHandle> {
        self.spy.clone().map(SpyHandle::from_record)
    }

    pub(crate) fn spy_record(&self) -> Option<&Rc<SpyRecord>> {
        self.spy.as_ref()
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.body), Rc::as_ptr(&other.body))
    }
}

// ============================================================================
// Raised — what a function throws
// ============================================================================

/// A value raised by a [`Function`] instead of returning.
///
/// `Value` is an arbitrary thrown value; `Error` is a typed error object.
/// `toThrow` accepts either, `toThrowError` only the latter.
#[derive(Clone, Debug)]
pub enum Raised {
    Value(Value),
    Error { kind: String, message: String },
}

impl Raised {
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Raised::Error {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Raised::Value(value.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Raised::Error { .. })
    }
}

impl fmt::Display for Raised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Raised::Value(value) => write!(f, "{value}"),
            Raised::Error { kind, message } => write!(f, "{kind}: {message}"),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(self, f, 0)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(self, f, 0)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_object(self, f, 0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_function(self, f)
    }
}

fn render(value: &Value, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    if depth > MAX_RENDER_DEPTH {
        return f.write_str("...");
    }
    match value {
        Value::Undefined => f.write_str("undefined"),
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Number(n) => render_number(*n, f),
        Value::Str(s) => write!(f, "'{s}'"),
        Value::List(items) => {
            if items.is_empty() {
                return f.write_str("[]");
            }
            f.write_str("[ ")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                render(item, f, depth + 1)?;
            }
            f.write_str(" ]")
        }
        Value::Object(object) => render_object(object, f, depth),
        Value::Function(function) => render_function(function, f),
    }
}

fn render_object(object: &Object, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    let props = object.props.borrow();
    if props.is_empty() {
        return f.write_str("Object({})");
    }
    f.write_str("Object({ ")?;
    for (i, (key, value)) in props.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{key}: ")?;
        render(value, f, depth + 1)?;
    }
    f.write_str(" })")
}

fn render_function(function: &Function, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match function.spy_record() {
        Some(record) => write!(f, "spy on {}", record.method()),
        None => f.write_str("Function"),
    }
}

fn render_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 && n.is_sign_negative() {
        f.write_str("-0")
    } else {
        write!(f, "{n}")
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! number_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

number_from!(f64, f32, i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Rc::new(items))
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<&Object> for Value {
    fn from(object: &Object) -> Self {
        Value::Object(object.clone())
    }
}

impl From<Function> for Value {
    fn from(function: Function) -> Self {
        Value::Function(function)
    }
}

impl From<&Function> for Value {
    fn from(function: &Function) -> Self {
        Value::Function(function.clone())
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

/// `None` converts to `Undefined`.
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Undefined, Into::into)
    }
}
