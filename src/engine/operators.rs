//! Arithmetic, comparison, concatenation, `in`, range, logical short-circuit
//! and the null-coalesce/default operators (spec §4.D). Grounded on the
//! teacher's `evaluator/helpers.rs`/`array_ops.rs` operator implementations,
//! generalized from JSON-Logic's flat operator list to JSONata's undefined-
//! propagation and numeric-range discipline.

use std::rc::Rc;

use crate::ast::Node;
use crate::coerce::{checked_number, to_concat_string, to_number};
use crate::context::Context;
use crate::engine::{self, EvalState};
use crate::error::{EvalError, EvalResult};
use crate::value::{comparison_equal, is_truthy, Value};

pub fn eval_binary(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let op = node.name().unwrap_or_default();
    match op {
        "and" => return eval_and(state, node, ctx),
        "or" => return eval_or(state, node, ctx),
        "??" => return eval_null_coalesce(state, node, ctx),
        "?:" => return eval_default(state, node, ctx),
        "~>" => {
            let lhs_node = node.lhs.as_ref().expect("Binary '~>' requires lhs");
            let rhs_node = node.rhs.as_ref().expect("Binary '~>' requires rhs");
            let left = engine::evaluate(state, lhs_node, ctx)?;
            return crate::lambda::eval_apply(state, left, rhs_node, ctx, node.position);
        }
        _ => {}
    }

    let lhs_node = node.lhs.as_ref().expect("Binary node requires lhs");
    let rhs_node = node.rhs.as_ref().expect("Binary node requires rhs");
    let left = engine::evaluate(state, lhs_node, ctx)?;
    let right = engine::evaluate(state, rhs_node, ctx)?;

    match op {
        "+" | "-" | "*" | "/" | "%" => eval_arithmetic(op, &left, &right, node.position),
        "&" => Ok(Value::String(format!("{}{}", to_concat_string(&left), to_concat_string(&right)))),
        "=" => Ok(Value::Bool(comparison_equal(&left, &right))),
        "!=" => Ok(Value::Bool(!comparison_equal(&left, &right))),
        "<" | "<=" | ">" | ">=" => eval_relational(op, &left, &right, node.position),
        "in" => eval_in(&left, &right),
        ".." => eval_range(&left, &right, node.position),
        other => Err(EvalError::invalid_signature(format!("unknown binary operator '{other}'"), node.position)),
    }
}

pub fn eval_unary(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let op = node.name().unwrap_or_default();
    let rhs_node = node.rhs.as_ref().expect("Unary node requires rhs");
    let value = engine::evaluate(state, rhs_node, ctx)?;
    match op {
        "-" => match value {
            Value::Undefined => Ok(Value::Undefined),
            other => {
                let n = to_number(&other, node.position)?;
                checked_number(-n, node.position)
            }
        },
        other => Err(EvalError::invalid_signature(format!("unknown unary operator '{other}'"), node.position)),
    }
}

/// Arithmetic (spec §4.D): either side `Undefined` propagates `Undefined`;
/// non-numeric non-undefined is a type error; NaN/∞ results are a
/// numeric-range error. `%` is mathematical modulo, not truncating remainder.
fn eval_arithmetic(op: &str, left: &Value, right: &Value, position: usize) -> EvalResult<Value> {
    if left.is_undefined() || right.is_undefined() {
        return Ok(Value::Undefined);
    }
    let a = to_number(left, position)?;
    let b = to_number(right, position)?;
    let result = match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" => {
            if b == 0.0 {
                return Err(EvalError::numeric_range(position));
            }
            a / b
        }
        "%" => a - b * (a / b).floor(),
        _ => unreachable!("eval_arithmetic only called for + - * / %"),
    };
    checked_number(result, position)
}

/// Strict relational operators (spec §4.D): same-kind number-or-string
/// only; undefined propagates; anything else (including booleans/null) is a
/// comparison-type error.
fn eval_relational(op: &str, left: &Value, right: &Value, position: usize) -> EvalResult<Value> {
    if left.is_undefined() || right.is_undefined() {
        return Ok(Value::Undefined);
    }
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => return Err(EvalError::comparison_type_mismatch(position)),
    };
    let ordering = ordering.ok_or_else(|| EvalError::comparison_type_mismatch(position))?;
    use std::cmp::Ordering::*;
    let result = match (op, ordering) {
        ("<", Less) | ("<=", Less) | ("<=", Equal) => true,
        (">", Greater) | (">=", Greater) | (">=", Equal) => true,
        _ => false,
    };
    Ok(Value::Bool(result))
}

/// `in` (spec §4.D): left compares equal to any element after the right is
/// coerced to an array.
fn eval_in(left: &Value, right: &Value) -> EvalResult<Value> {
    let items = right.clone().to_array();
    Ok(Value::Bool(items.iter().any(|item| comparison_equal(left, item))))
}

/// Range `..` (spec §4.D): integer bounds only; undefined either side or
/// `start > end` yields an empty array; size above 10,000,000 errors.
fn eval_range(left: &Value, right: &Value, position: usize) -> EvalResult<Value> {
    if left.is_undefined() || right.is_undefined() {
        return Ok(Value::Array(Vec::new()));
    }
    let start = to_number(left, position)?;
    let end = to_number(right, position)?;
    if start.fract() != 0.0 || end.fract() != 0.0 {
        return Err(EvalError::non_integer_range_bound(position));
    }
    let (start, end) = (start as i64, end as i64);
    if start > end {
        return Ok(Value::Array(Vec::new()));
    }
    let size = (end - start + 1) as i64;
    if size > 10_000_000 {
        return Err(EvalError::range_too_large(position));
    }
    Ok(Value::Array((start..=end).map(|n| Value::Number(n as f64)).collect()))
}

/// Logical `and`/`or` (spec §4.D): short-circuit on plain truthiness,
/// always returning a boolean; a left-side evaluation error is NOT swallowed
/// (only `??`/`?:` recover from errors, per spec §7).
fn eval_and(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let lhs_node = node.lhs.as_ref().expect("Binary 'and' requires lhs");
    let left = engine::evaluate(state, lhs_node, ctx)?;
    if !is_truthy(&left) {
        return Ok(Value::Bool(false));
    }
    let rhs_node = node.rhs.as_ref().expect("Binary 'and' requires rhs");
    Ok(Value::Bool(is_truthy(&engine::evaluate(state, rhs_node, ctx)?)))
}

fn eval_or(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let lhs_node = node.lhs.as_ref().expect("Binary 'or' requires lhs");
    let left = engine::evaluate(state, lhs_node, ctx)?;
    if is_truthy(&left) {
        return Ok(Value::Bool(true));
    }
    let rhs_node = node.rhs.as_ref().expect("Binary 'or' requires rhs");
    Ok(Value::Bool(is_truthy(&engine::evaluate(state, rhs_node, ctx)?)))
}

/// `??` (spec §4.D): the left if not undefined, else the right. A left-side
/// evaluation error is swallowed and the right is evaluated instead.
fn eval_null_coalesce(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let lhs_node = node.lhs.as_ref().expect("Binary '??' requires lhs");
    let rhs_node = node.rhs.as_ref().expect("Binary '??' requires rhs");
    match engine::evaluate(state, lhs_node, ctx) {
        Ok(left) if !left.is_undefined() => Ok(left),
        _ => engine::evaluate(state, rhs_node, ctx),
    }
}

/// `?:` (spec §4.D): the left if default-truthy (`$boolean` semantics),
/// else the right. A left-side evaluation error is swallowed.
fn eval_default(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let lhs_node = node.lhs.as_ref().expect("Binary '?:' requires lhs");
    let rhs_node = node.rhs.as_ref().expect("Binary '?:' requires rhs");
    match engine::evaluate(state, lhs_node, ctx) {
        Ok(left) if crate::value::is_boolean_truthy(&left) => Ok(left),
        _ => engine::evaluate(state, rhs_node, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_propagates_undefined() {
        let result = eval_arithmetic("+", &Value::Undefined, &Value::Number(1.0), 0).unwrap();
        assert_eq!(result, Value::Undefined);
    }

    #[test]
    fn test_division_by_zero_is_numeric_range_error() {
        assert!(eval_arithmetic("/", &Value::Number(1.0), &Value::Number(0.0), 0).is_err());
    }

    #[test]
    fn test_modulo_is_mathematical() {
        let result = eval_arithmetic("%", &Value::Number(-7.0), &Value::Number(3.0), 0).unwrap();
        assert_eq!(result, Value::Number(2.0));
    }

    #[test]
    fn test_relational_rejects_mixed_types() {
        assert!(eval_relational("<", &Value::Number(1.0), &Value::String("a".into()), 0).is_err());
    }

    #[test]
    fn test_relational_propagates_undefined() {
        let result = eval_relational("<", &Value::Undefined, &Value::Number(1.0), 0).unwrap();
        assert_eq!(result, Value::Undefined);
    }

    #[test]
    fn test_range_empty_when_start_greater_than_end() {
        let result = eval_range(&Value::Number(10.0), &Value::Number(1.0), 0).unwrap();
        assert_eq!(result, Value::Array(vec![]));
    }

    #[test]
    fn test_range_too_large_errors() {
        assert!(eval_range(&Value::Number(1.0), &Value::Number(10_000_001.0), 0).is_err());
    }

    #[test]
    fn test_in_operator_coerces_scalar_to_array() {
        let result = eval_in(&Value::Number(2.0), &Value::Number(2.0)).unwrap();
        assert_eq!(result, Value::Bool(true));
    }
}
