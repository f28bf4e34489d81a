//! The runtime value universe (spec §3.1) and its operations.
//!
//! `Value` is a hand-rolled tagged enum rather than `serde_json::Value`: it
//! needs an `Undefined` variant distinct from `Null`, and lambda/builtin/regex
//! variants with their own equality, truthiness and stringification rules.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::builtins::BuiltinFn;
use crate::lambda::Lambda;

/// An insertion-order-preserving JSON object (spec §3.1 invariant: rebinding a
/// key overwrites its value but does not change its position).
pub type OrderedObject = IndexMap<String, Value>;

/// The tagged value universe the evaluator manipulates.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absence of a value. Never appears inside `Array`/`Object` — path steps
    /// and constructors elide it before it can be nested.
    Undefined,
    /// JSON `null`. Distinct from `Undefined` in every observable operator.
    Null,
    Bool(bool),
    /// IEEE-754 double. NaN/±Infinity never escape the evaluator (arithmetic
    /// producing them fails with a numeric-range error instead).
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(OrderedObject),
    Lambda(Rc<Lambda>),
    BuiltinFn(Rc<BuiltinFn>),
    Regex(Rc<regex::Regex>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(items)
    }

    pub fn object(map: OrderedObject) -> Value {
        Value::Object(map)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Lambda(_) | Value::BuiltinFn(_))
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a.as_slice()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Wrap a non-array value in a singleton array; leave arrays untouched.
    /// Used by `Eval`'s top-level unwrap and by signature auto-wrapping (§4.F).
    pub fn to_array(self) -> Vec<Value> {
        match self {
            Value::Array(a) => a,
            Value::Undefined => Vec::new(),
            other => vec![other],
        }
    }
}

/// Deep structural equality (spec §4.A): `Number` via IEEE `==`, `Null` only
/// equal to `Null`, `Array` element-wise, `Object` by set-of-keys (order is
/// NOT part of equality).
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => true,
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| deep_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|v2| deep_equal(v, v2)))
        }
        (Value::Regex(x), Value::Regex(y)) => x.as_str() == y.as_str(),
        _ => false,
    }
}

/// Comparison equality (spec §4.C): numeric/boolean cross-coercion, `Null`
/// equal only to itself, everything else falls through to deep structural
/// equality.
pub fn comparison_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(b), Value::Number(n)) | (Value::Number(n), Value::Bool(b)) => {
            (if *b { 1.0 } else { 0.0 }) == *n
        }
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        _ => deep_equal(a, b),
    }
}

/// Plain truthiness (spec §4.C `is_truthy`).
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Lambda(_) | Value::BuiltinFn(_) | Value::Regex(_) => true,
    }
}

/// `$boolean`/default-operator truthiness: as `is_truthy`, plus arrays are
/// true only if some element is recursively truthy, and functions are false.
pub fn is_boolean_truthy(value: &Value) -> bool {
    match value {
        Value::Array(a) => a.iter().any(is_boolean_truthy),
        Value::Lambda(_) | Value::BuiltinFn(_) => false,
        other => is_truthy(other),
    }
}

/// Ordering used by sort (spec §4.C `compareValues`): numeric first, else
/// string; any other pairing yields `Equal` so a stable sort preserves input
/// order.
pub fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Structural equality for tests and internal bookkeeping (e.g. context
/// bindings lookups). Functions compare by `Rc` identity; regexes by pattern.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Lambda(x), Value::Lambda(y)) => Rc::ptr_eq(x, y),
            (Value::BuiltinFn(x), Value::BuiltinFn(y)) => Rc::ptr_eq(x, y),
            (Value::Regex(x), Value::Regex(y)) => x.as_str() == y.as_str(),
            _ => deep_equal(self, other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::coerce::to_display_string(self))
    }
}
