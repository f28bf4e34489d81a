//! A tree-walking evaluator for a JSONata-dialect query language: path
//! navigation, closures with lexical capture, tail-call optimisation, the
//! context-carrying `#`/`@`/`%` operators, `~>` apply/compose/transform, and
//! JSON-aware coercion and comparison rules.
//!
//! The lexer/parser that produces an [`ast::Node`] tree, and the standard
//! library of `$`-prefixed built-in functions, are out of scope for this
//! crate — both are external collaborators this crate only names a contract
//! for ([`builtins::Registry`]).

pub mod ast;
pub mod builtins;
pub mod cbv;
pub mod coerce;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod lambda;
pub mod regex_pool;
pub mod transform;
pub mod value;

use std::rc::Rc;

pub use ast::{Node, NodeKind, NodeValue, SortTerm};
pub use builtins::{Arity, BuiltinFn, Registry};
pub use config::{DebugLogger, EvalOptions};
pub use context::Context;
pub use error::{EvalError, EvalResult};
pub use value::Value;

use coerce::{from_json_value, to_json_value};
use engine::EvalState;

/// Evaluate `expr` against `data` with default options (spec §6.4).
///
/// `data` and the return value are `serde_json::Value` at the host boundary;
/// internally the evaluator works over its own [`value::Value`], which keeps
/// `Undefined` distinct from `Null` ([`value::Value::Null`] round-trips as
/// JSON `null`; there is no JSON representation of `Undefined`, so a
/// top-level undefined result collapses to JSON `null`).
pub fn evaluate(expr: &Node, data: &serde_json::Value) -> EvalResult<serde_json::Value> {
    evaluate_with_options(expr, data, &[], EvalOptions::default())
}

/// Evaluate `expr` against `data` with extra top-level variable bindings
/// (spec §6.4), e.g. the `$bindings` a host installs before running a user
/// expression.
pub fn evaluate_with_bindings(
    expr: &Node,
    data: &serde_json::Value,
    bindings: &[(String, serde_json::Value)],
) -> EvalResult<serde_json::Value> {
    evaluate_with_options(expr, data, bindings, EvalOptions::default())
}

/// The full entry point: explicit [`EvalOptions`] (depth limit, timeout,
/// logger, custom [`Registry`]) alongside bindings.
pub fn evaluate_with_options(
    expr: &Node,
    data: &serde_json::Value,
    bindings: &[(String, serde_json::Value)],
    options: EvalOptions,
) -> EvalResult<serde_json::Value> {
    let state = EvalState::new(options);
    let root = Context::new_root(from_json_value(data));
    for (name, value) in bindings {
        root.set_binding(name.clone(), from_json_value(value));
    }
    let result = engine::evaluate(&state, expr, &root)?;
    Ok(to_json_value(&result))
}

/// Evaluate `expr` against an already-converted internal [`Value`], staying
/// entirely within the evaluator's own value universe. Used by hosts that
/// build `data` directly (e.g. the result of a prior evaluation) rather than
/// round-tripping through `serde_json::Value`.
pub fn evaluate_value(expr: &Node, data: Value, options: EvalOptions) -> EvalResult<Value> {
    let state = EvalState::new(options);
    let root = Context::new_root(data);
    engine::evaluate(&state, expr, &root)
}

/// Evaluate `expr` in an explicit, caller-constructed context — the
/// lowest-level entry point, used when the caller already has a [`Context`]
/// (e.g. a nested sub-evaluation from a host built-in function).
pub fn evaluate_in_context(state: &EvalState, expr: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    engine::evaluate(state, expr, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::NodeValue;

    fn name_node(name: &str) -> Node {
        Node::new(NodeKind::Name, 0).with_value(NodeValue::Str(name.to_string()))
    }

    #[test]
    fn test_evaluate_simple_field_lookup() {
        let expr = name_node("a");
        let data = serde_json::json!({ "a": 1 });
        let result = evaluate(&expr, &data).unwrap();
        assert_eq!(result, serde_json::json!(1.0));
    }

    #[test]
    fn test_evaluate_missing_field_is_null_at_host_boundary() {
        let expr = name_node("missing");
        let data = serde_json::json!({ "a": 1 });
        let result = evaluate(&expr, &data).unwrap();
        assert_eq!(result, serde_json::Value::Null);
    }

    #[test]
    fn test_evaluate_with_bindings_exposes_variable() {
        let expr = Node::new(NodeKind::Variable, 0).with_value(NodeValue::Str("x".to_string()));
        let data = serde_json::json!(null);
        let bindings = vec![("x".to_string(), serde_json::json!(42))];
        let result = evaluate_with_bindings(&expr, &data, &bindings).unwrap();
        assert_eq!(result, serde_json::json!(42.0));
    }
}
