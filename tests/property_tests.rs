//! Universal invariants the evaluator must uphold regardless of which
//! expression exercises them: sequence/singleton collapse, the
//! `Null`-vs-`Undefined` split, deep equality, sort stability, tail-call
//! safety, and the numeric-range/range-size guards.

mod common;

use jsonata_core::coerce::from_json_value;
use jsonata_core::config::EvalOptions;
use jsonata_core::value::Value;
use jsonata_core::{evaluate, evaluate_value};
use serde_json::json;

use common::*;

#[test]
fn test_no_nan_or_infinity_escapes_arithmetic() {
    // 0 % 0 reduces to 0 - 0 * NaN.floor() = NaN internally; `checked_number`
    // must reject it rather than let a `Number(NaN)` leak out.
    let expr = binary("%", num_lit(0.0), num_lit(0.0));
    let data = json!(null);
    assert!(evaluate(&expr, &data).is_err());
}

#[test]
fn test_singleton_collapses_without_trailing_keep_array() {
    let data = json!({ "a": [{"v": 9}] });
    let expr = path(vec![name("a"), name("v")]);
    assert_eq!(evaluate(&expr, &data).unwrap(), json!(9.0));
}

#[test]
fn test_singleton_stays_array_with_trailing_keep_array() {
    let data = json!({ "a": [{"v": 9}] });
    let mut expr = path(vec![name("a"), name("v")]);
    expr.keep_array = true;
    assert_eq!(evaluate(&expr, &data).unwrap(), json!([9.0]));
}

#[test]
fn test_undefined_propagates_through_missing_path_segments() {
    let data = json!({});
    let expr = path(vec![name("a"), name("b"), name("c")]);
    let result = evaluate_value(&expr, from_json_value(&data), EvalOptions::default()).unwrap();
    assert!(result.is_undefined());
}

#[test]
fn test_undefined_propagates_through_arithmetic() {
    // `x` is an unbound variable: looks up to Undefined, and `Undefined + 1`
    // must stay Undefined rather than coercing to a number.
    let data = json!({});
    let expr = binary("+", var("x"), num_lit(1.0));
    let result = evaluate_value(&expr, from_json_value(&data), EvalOptions::default()).unwrap();
    assert!(result.is_undefined());
}

#[test]
fn test_null_and_undefined_are_distinct_internally() {
    let data = json!({ "a": null });

    let present = evaluate_value(&name("a"), from_json_value(&data), EvalOptions::default()).unwrap();
    assert_eq!(present, Value::Null);

    let missing = evaluate_value(&name("a"), from_json_value(&json!({})), EvalOptions::default()).unwrap();
    assert!(missing.is_undefined());

    // ...but both round-trip to JSON `null` at the host boundary, since JSON
    // has no representation for `Undefined`.
    assert_eq!(evaluate(&name("a"), &data).unwrap(), serde_json::Value::Null);
    assert_eq!(evaluate(&name("a"), &json!({})).unwrap(), serde_json::Value::Null);
}

#[test]
fn test_deep_equality_array_order_matters() {
    let same_order = binary("=", array(vec![num_lit(1.0), num_lit(2.0)]), array(vec![num_lit(1.0), num_lit(2.0)]));
    assert_eq!(evaluate(&same_order, &json!(null)).unwrap(), json!(true));

    let different_order = binary("=", array(vec![num_lit(1.0), num_lit(2.0)]), array(vec![num_lit(2.0), num_lit(1.0)]));
    assert_eq!(evaluate(&different_order, &json!(null)).unwrap(), json!(false));
}

#[test]
fn test_deep_equality_object_key_order_does_not_matter() {
    let left = object(vec![(str_lit("a"), num_lit(1.0)), (str_lit("b"), num_lit(2.0))]);
    let right = object(vec![(str_lit("b"), num_lit(2.0)), (str_lit("a"), num_lit(1.0))]);
    let expr = binary("=", left, right);
    assert_eq!(evaluate(&expr, &json!(null)).unwrap(), json!(true));
}

#[test]
fn test_sort_is_stable_for_equal_keys() {
    let data = json!([
        {"k": 1, "id": "a"},
        {"k": 1, "id": "b"},
        {"k": 0, "id": "c"},
    ]);
    let expr = sort(var(""), vec![(name("k"), false)]);
    let result = evaluate(&expr, &data).unwrap();
    let ids: Vec<&str> = result.as_array().unwrap().iter().map(|v| v["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[test]
fn test_tail_recursive_sum_does_not_overflow_at_scale() {
    // $f := function($n, $a) { $n = 0 ? $a : $f($n - 1, $a + $n) }; $f(1000000, 0)
    let body = condition(
        binary("=", var("n"), num_lit(0.0)),
        var("a"),
        Some(call(
            var("f"),
            vec![binary("-", var("n"), num_lit(1.0)), binary("+", var("a"), var("n"))],
        )),
    );
    let recursive_lambda = lambda(vec!["n", "a"], None, body);
    let expr = block(vec![bind("f", recursive_lambda), call(var("f"), vec![num_lit(1_000_000.0), num_lit(0.0)])]);

    let result = evaluate(&expr, &json!(null)).unwrap();
    assert_eq!(result, json!(500_000_500_000.0));
}

#[test]
fn test_range_too_large_errors() {
    let expr = binary("..", num_lit(1.0), num_lit(10_000_001.0));
    assert!(evaluate(&expr, &json!(null)).is_err());
}

#[test]
fn test_range_with_start_after_end_is_empty() {
    let expr = binary("..", num_lit(10.0), num_lit(1.0));
    assert_eq!(evaluate(&expr, &json!(null)).unwrap(), json!([]));
}
