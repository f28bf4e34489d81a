//! The transform operator `~> |path|update|delete|` (spec §4.E/§4.F):
//! deep-clone the input, locate every node the path expression matches in
//! the clone, merge `update` into each and remove `delete` keys, leaving the
//! original untouched. Grounded on the teacher's `data_wrapper.rs` clone-on-
//! write discipline, generalized from a single top-level replace to
//! path-directed, possibly-multi-target, in-place mutation of a cloned tree.

use std::rc::Rc;

use crate::ast::{Node, NodeKind};
use crate::context::Context;
use crate::engine::{self, EvalState};
use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// `Transform` evaluated as its own node: the input is the current `$`.
pub fn eval_transform(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    eval_transform_on(state, node, &ctx.data, ctx)
}

/// `Transform` evaluated as the right side of `~>`: the input is the
/// already-evaluated left side rather than `ctx.data`.
pub fn eval_transform_on(state: &EvalState, node: &Node, input: &Value, ctx: &Rc<Context>) -> EvalResult<Value> {
    let path_node = node.lhs.as_ref().expect("Transform node requires a path (lhs)");
    let update_node = node.rhs.as_ref().expect("Transform node requires an update expression (rhs)");

    let mut cloned = input.clone();
    apply_to_matches(state, path_node, &mut cloned, ctx, &mut |state, target, ctx| {
        let target_ctx = ctx.child(target.clone());
        let update = engine::evaluate(state, update_node, &target_ctx)?;
        merge_update(target, &update, update_node.position)?;
        if let Some(delete_node) = &node.delete {
            let delete = engine::evaluate(state, delete_node, &target_ctx)?;
            delete_keys(target, &delete, delete_node.position)?;
        }
        Ok(())
    })?;
    Ok(cloned)
}

fn merge_update(target: &mut Value, update: &Value, position: usize) -> EvalResult<()> {
    if update.is_undefined() {
        return Ok(());
    }
    let Value::Object(patch) = update else {
        return Err(EvalError::update_not_object(position));
    };
    let Value::Object(map) = target else {
        return Err(EvalError::update_not_object(position));
    };
    for (key, value) in patch {
        map.insert(key.clone(), value.clone());
    }
    Ok(())
}

fn delete_keys(target: &mut Value, delete: &Value, position: usize) -> EvalResult<()> {
    if delete.is_undefined() {
        return Ok(());
    }
    let keys: Vec<String> = match delete {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                _ => Err(EvalError::delete_not_string_or_array(position)),
            })
            .collect::<EvalResult<_>>()?,
        _ => return Err(EvalError::delete_not_string_or_array(position)),
    };
    if let Value::Object(map) = target {
        for key in keys {
            map.shift_remove(&key);
        }
    }
    Ok(())
}

type TargetFn<'a> = dyn FnMut(&EvalState, &mut Value, &Rc<Context>) -> EvalResult<()> + 'a;

/// Walk `value` along `path_node`'s steps (mirroring `engine::path`'s
/// read-only navigation) and invoke `apply` on every object the path
/// resolves to. Supports the step shapes a transform pattern actually
/// uses: plain field names, `Path` chains of them, wildcards, and filter
/// predicates; arrays are auto-mapped at every step, matching ordinary path
/// semantics.
fn apply_to_matches(state: &EvalState, path_node: &Node, value: &mut Value, ctx: &Rc<Context>, apply: &mut TargetFn) -> EvalResult<()> {
    match path_node.kind {
        NodeKind::Path => apply_steps(state, &path_node.expressions, 0, value, ctx, apply),
        _ => apply_steps(state, std::slice::from_ref(path_node), 0, value, ctx, apply),
    }
}

fn apply_steps(state: &EvalState, steps: &[Node], idx: usize, value: &mut Value, ctx: &Rc<Context>, apply: &mut TargetFn) -> EvalResult<()> {
    if idx == steps.len() {
        return apply_terminal(state, value, ctx, apply);
    }
    let step = &steps[idx];
    match step.kind {
        NodeKind::Name => {
            let field = step.name().unwrap_or_default();
            step_name(state, field, steps, idx, value, ctx, apply)
        }
        NodeKind::Wildcard => step_wildcard(state, steps, idx, value, ctx, apply),
        NodeKind::Filter => step_filter(state, step, steps, idx, value, ctx, apply),
        _ => Ok(()),
    }
}

fn step_name(state: &EvalState, field: &str, steps: &[Node], idx: usize, value: &mut Value, ctx: &Rc<Context>, apply: &mut TargetFn) -> EvalResult<()> {
    match value {
        Value::Object(map) => {
            if let Some(child) = map.get_mut(field) {
                apply_steps(state, steps, idx + 1, child, ctx, apply)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                step_name(state, field, steps, idx, item, ctx, apply)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn step_wildcard(state: &EvalState, steps: &[Node], idx: usize, value: &mut Value, ctx: &Rc<Context>, apply: &mut TargetFn) -> EvalResult<()> {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                apply_steps(state, steps, idx + 1, child, ctx, apply)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                apply_steps(state, steps, idx + 1, item, ctx, apply)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn step_filter(state: &EvalState, step: &Node, steps: &[Node], idx: usize, value: &mut Value, ctx: &Rc<Context>, apply: &mut TargetFn) -> EvalResult<()> {
    let predicate = step.rhs.as_ref();
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                let keep = match predicate {
                    None => true,
                    Some(pred) => {
                        let probe_ctx = ctx.array_item_child(item.clone());
                        let result = engine::evaluate(state, pred, &probe_ctx)?;
                        match result.as_f64() {
                            Some(n) => (n as i64) == i as i64 || (n < 0.0 && (items_len_signed(items.len()) + n as i64) == i as i64),
                            None => crate::value::is_truthy(&result),
                        }
                    }
                };
                if keep {
                    apply_steps(state, steps, idx + 1, item, ctx, apply)?;
                }
            }
            Ok(())
        }
        other => {
            let keep = match predicate {
                None => true,
                Some(pred) => {
                    let probe_ctx = ctx.array_item_child(other.clone());
                    crate::value::is_truthy(&engine::evaluate(state, pred, &probe_ctx)?)
                }
            };
            if keep {
                apply_steps(state, steps, idx + 1, other, ctx, apply)?;
            }
            Ok(())
        }
    }
}

fn items_len_signed(len: usize) -> i64 {
    len as i64
}

fn apply_terminal(state: &EvalState, value: &mut Value, ctx: &Rc<Context>, apply: &mut TargetFn) -> EvalResult<()> {
    match value {
        Value::Array(items) => {
            for item in items.iter_mut() {
                apply_terminal(state, item, ctx, apply)?;
            }
            Ok(())
        }
        Value::Object(_) => apply(state, value, ctx),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeValue;
    use crate::config::EvalOptions;

    fn name_node(name: &str) -> Node {
        Node::new(NodeKind::Name, 0).with_value(NodeValue::Str(name.to_string()))
    }

    fn obj(pairs: Vec<(&str, Value)>) -> Value {
        let mut map = indexmap::IndexMap::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v);
        }
        Value::Object(map)
    }

    #[test]
    fn test_merge_update_into_single_object() {
        let state = EvalState::new(EvalOptions::default());
        let ctx = Context::new_root(Value::Null);
        let mut cloned = obj(vec![("a", Value::Number(1.0))]);

        apply_terminal(&state, &mut cloned, &ctx, &mut |_s, target, _c| {
            merge_update(target, &obj(vec![("b", Value::Number(2.0))]), 0)
        })
        .unwrap();

        if let Value::Object(map) = &cloned {
            assert_eq!(map.get("b"), Some(&Value::Number(2.0)));
            assert_eq!(map.get("a"), Some(&Value::Number(1.0)));
        } else {
            panic!("expected object");
        }
    }

    #[test]
    fn test_delete_keys_preserves_order_of_remaining() {
        let mut target = obj(vec![("a", Value::Number(1.0)), ("b", Value::Number(2.0)), ("c", Value::Number(3.0))]);
        delete_keys(&mut target, &Value::String("b".into()), 0).unwrap();
        if let Value::Object(map) = &target {
            let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
            assert_eq!(keys, vec!["a", "c"]);
        } else {
            panic!("expected object");
        }
    }

    #[test]
    fn test_merge_update_rejects_non_object() {
        let mut target = obj(vec![("a", Value::Number(1.0))]);
        let result = merge_update(&mut target, &Value::Number(5.0), 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_step_name_navigates_into_nested_field() {
        let state = EvalState::new(EvalOptions::default());
        let ctx = Context::new_root(Value::Null);
        let mut value = obj(vec![("a", obj(vec![("b", Value::Number(1.0))]))]);
        let steps = vec![name_node("a"), name_node("b")];
        let mut seen = Vec::new();
        apply_steps(&state, &steps, 0, &mut value, &ctx, &mut |_s, target, _c| {
            seen.push(target.clone());
            Ok(())
        })
        .unwrap();
        assert!(seen.is_empty(), "field 'b' resolves to a Number, not an Object, so no terminal object is visited");
    }
}
