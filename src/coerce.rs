//! Coercion and display rules (spec §4.C), grounded on the teacher's
//! `evaluator/helpers.rs` (`to_f64`, `to_string`) generalized to JSONata's
//! number-formatting conventions (an integral `f64` prints without a decimal
//! point; everything else round-trips through `serde_json`'s formatter).

use crate::error::{EvalError, EvalResult};
use crate::value::{OrderedObject, Value};

/// Coerce to a number for arithmetic/range operands (spec §4.D: "both
/// operands must be numeric or undefined"). Only `Number` itself succeeds —
/// a `String`, even a numeric-looking one, is non-numeric and is a type
/// error at `position`; callers handle `Undefined` propagation themselves.
pub fn to_number(value: &Value, position: usize) -> EvalResult<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        _ => Err(EvalError::non_numeric_operand(position)),
    }
}

/// Reject NaN/±Infinity results from arithmetic (spec §4.C numeric-range
/// invariant: such results never escape the evaluator).
pub fn checked_number(n: f64, position: usize) -> EvalResult<Value> {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(EvalError::numeric_range(position))
    }
}

/// `$string`/string-concatenation stringification. Distinct from `Display`
/// (used for error messages and debug logging) only in that `Undefined`
/// stringifies to an empty string here, matching JSONata's `&` operator,
/// while `Display` renders it as `undefined` for diagnostics.
pub fn to_concat_string(value: &Value) -> String {
    match value {
        Value::Undefined => String::new(),
        Value::String(s) => s.clone(),
        other => to_display_string(other),
    }
}

/// Render a value the way `$string`/error messages/debug logs do.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            to_json_value(value).to_string()
        }
        Value::Lambda(l) => format!("{{function:{}}}", l.signature_text()),
        Value::BuiltinFn(f) => format!("{{function:{}}}", f.name),
        Value::Regex(r) => format!("/{}/", r.as_str()),
    }
}

/// JSONata prints integral doubles without a trailing `.0`; everything else
/// uses the shortest round-tripping representation `f64::to_string` gives.
pub fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Convert a `Value` tree into a `serde_json::Value`, e.g. for `$string` of
/// a structured value or for returning results across the host boundary.
/// `Undefined` has no JSON representation; callers must have already elided
/// it (path/constructor code never nests it, per spec §3.1).
pub fn to_json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Undefined => serde_json::Value::Null,
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json_value).collect()),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k.clone(), to_json_value(v));
            }
            serde_json::Value::Object(out)
        }
        Value::Lambda(l) => serde_json::Value::String(format!("{{function:{}}}", l.signature_text())),
        Value::BuiltinFn(f) => serde_json::Value::String(format!("{{function:{}}}", f.name)),
        Value::Regex(r) => serde_json::Value::String(format!("/{}/", r.as_str())),
    }
}

/// Convert a `serde_json::Value` into the evaluator's internal `Value`
/// (the host-input boundary: top-level data, bound variables).
pub fn from_json_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(from_json_value).collect()),
        serde_json::Value::Object(map) => {
            let mut out = OrderedObject::new();
            for (k, v) in map {
                out.insert(k.clone(), from_json_value(v));
            }
            Value::Object(out)
        }
    }
}
