//! The path engine (spec §4.E): field lookup, path-step iteration with
//! `ContextBoundValue` propagation, descendant `**`, wildcard `*`, filter
//! (index/multi-index/predicate), array/object constructors and grouping,
//! and `Sort`. Grounded on the teacher's `evaluator/array_ops.rs` for the
//! map-flatten-elide shape of array-aware field access, generalized to
//! singleton collapse and the context-chain threading a JSON-Logic rule
//! engine never needed.

use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::ast::{Node, NodeKind};
use crate::cbv::ContextBoundValue;
use crate::context::Context;
use crate::engine::{self, EvalState};
use crate::error::{EvalError, EvalResult};
use crate::value::{compare_values, deep_equal, is_truthy, OrderedObject, Value};

/// Collapse a result sequence per spec §4.E: empty → `Undefined`, one
/// element (and no `keep_array` anywhere in the chain) → that element,
/// otherwise the sequence as an array.
pub fn collapse(mut items: Vec<Value>, keep_array: bool) -> Value {
    if keep_array {
        return Value::Array(items);
    }
    match items.len() {
        0 => Value::Undefined,
        1 => items.pop().unwrap(),
        _ => Value::Array(items),
    }
}

/// Field lookup on a value (spec §4.E table): objects return the field or
/// `Undefined`; arrays map the lookup over elements, flattening one level
/// and eliding `Undefined`; anything else is `Undefined`.
pub fn lookup_field(value: &Value, field: &str) -> Value {
    match value {
        Value::Object(map) => map.get(field).cloned().unwrap_or(Value::Undefined),
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                match lookup_field(item, field) {
                    Value::Undefined => {}
                    Value::Array(sub) => out.extend(sub),
                    other => out.push(other),
                }
            }
            if out.is_empty() {
                Value::Undefined
            } else {
                Value::Array(out)
            }
        }
        _ => Value::Undefined,
    }
}

/// Wildcard `*`: concatenation of all immediate field values (object) or
/// elements (array), flattened one level.
pub fn eval_wildcard(value: &Value) -> Value {
    let items = match value {
        Value::Object(map) => {
            let mut out = Vec::new();
            for v in map.values() {
                match v {
                    Value::Array(items) => out.extend(items.clone()),
                    Value::Undefined => {}
                    other => out.push(other.clone()),
                }
            }
            out
        }
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    };
    collapse(items, false)
}

fn collect_descendants(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_descendants(item, out);
            }
        }
        Value::Object(map) => {
            out.push(value.clone());
            for v in map.values() {
                collect_descendants(v, out);
            }
        }
        other => out.push(other.clone()),
    }
}

fn dedupe(items: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.iter().any(|existing| deep_equal(existing, &item)) {
            out.push(item);
        }
    }
    out
}

/// Descendant `**` (spec §4.E): depth-first flat sequence of every
/// non-array value reachable from the current `$`; with an RHS, evaluate it
/// as a path rooted at each descendant (and the root itself), concatenate
/// and deduplicate.
pub fn eval_descendant(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let left = ctx.data.clone();
    let mut descendants = Vec::new();
    collect_descendants(&left, &mut descendants);

    match &node.rhs {
        None => Ok(collapse(dedupe(descendants), node.keep_array)),
        Some(rhs) => {
            let mut candidates = vec![left];
            candidates.extend(descendants);
            let mut results = Vec::new();
            for candidate in candidates {
                let child_ctx = ctx.child(candidate);
                match engine::evaluate(state, rhs, &child_ctx)? {
                    Value::Undefined => {}
                    Value::Array(items) => results.extend(items),
                    other => results.push(other),
                }
            }
            Ok(collapse(dedupe(results), node.keep_array))
        }
    }
}

/// Expand a length-1 sequence whose sole CBV wraps an array into one CBV
/// per element, inheriting the original CBV's bindings/rewind/container
/// (spec §4.E "possibly wrapped as a single CBV"). A sequence that is
/// already multi-element, or a single non-array item, passes through.
pub(crate) fn expand_items(current: Vec<ContextBoundValue>) -> Vec<ContextBoundValue> {
    if current.len() == 1 {
        if let Value::Array(items) = current[0].value.clone() {
            let source = &current[0];
            return items.into_iter().map(|v| source.rewrap(v)).collect();
        }
    }
    current
}

fn is_undefined_single(current: &[ContextBoundValue]) -> bool {
    current.len() == 1 && current[0].value.is_undefined()
}

/// Wrap/splice a single step's per-item result into the output sequence
/// (spec §4.E "append results to the output sequence... splice its
/// elements... wrap each spliced sub-result").
fn append_spliced(out: &mut Vec<ContextBoundValue>, step: &Node, result: Value, source: &ContextBoundValue) {
    let splice_exempt = matches!(step.kind, NodeKind::Array)
        || (step.kind == NodeKind::Filter && matches!(step.lhs.as_deref().map(|n| n.kind), Some(NodeKind::Array)));

    match result {
        Value::Undefined => {}
        Value::Array(items) if !splice_exempt => {
            let has_bindings = !source.bindings.is_empty();
            for item in items {
                if has_bindings {
                    out.push(source.rewrap_spent(item));
                } else {
                    out.push(ContextBoundValue::new(item).with_container(source.step_input().clone()));
                }
            }
        }
        other => {
            if !source.bindings.is_empty() {
                out.push(source.rewrap_spent(other));
            } else {
                out.push(ContextBoundValue::new(other));
            }
        }
    }
}

fn child_for_item(outer_ctx: &Rc<Context>, item: &ContextBoundValue) -> Rc<Context> {
    let child = match &item.container {
        Some(container) => outer_ctx.array_item_child_with_container(item.step_input().clone(), container.clone()),
        None => outer_ctx.array_item_child(item.step_input().clone()),
    };
    for (name, value) in &item.bindings {
        child.set_binding(name.clone(), value.clone());
    }
    child
}

/// The ordinary per-item path step (spec §4.E "Path step `A.B`"): iterate
/// when the left is array-like, otherwise push one plain child context.
fn eval_generic_step(state: &EvalState, step: &Node, outer_ctx: &Rc<Context>, current: Vec<ContextBoundValue>) -> EvalResult<(Vec<ContextBoundValue>, bool)> {
    let arrayish = current.len() > 1 || (current.len() == 1 && current[0].value.is_array());
    if arrayish {
        let items = expand_items(current);
        let mut out = Vec::new();
        for item in &items {
            let child_ctx = child_for_item(outer_ctx, item);
            let result = engine::evaluate(state, step, &child_ctx)?;
            append_spliced(&mut out, step, result, item);
        }
        Ok((out, step.keep_array))
    } else {
        let item = &current[0];
        let child_ctx = outer_ctx.child(item.step_input().clone());
        for (name, value) in &item.bindings {
            child_ctx.set_binding(name.clone(), value.clone());
        }
        let result = engine::evaluate(state, step, &child_ctx)?;
        let mut out = Vec::new();
        append_spliced(&mut out, step, result, item);
        Ok((out, step.keep_array))
    }
}

fn numeric_indices(probe: &Value) -> Option<Vec<f64>> {
    match probe {
        Value::Number(n) => Some(vec![*n]),
        Value::Array(items) if !items.is_empty() && items.iter().all(|v| matches!(v, Value::Number(_))) => {
            Some(items.iter().map(|v| v.as_f64().unwrap()).collect())
        }
        _ => None,
    }
}

fn resolve_index(i: f64, len: usize) -> Option<usize> {
    let len = len as i64;
    let idx = i.trunc() as i64;
    let idx = if idx < 0 { len + idx } else { idx };
    if idx >= 0 && idx < len {
        Some(idx as usize)
    } else {
        None
    }
}

fn index_select(items: &[Value], indices: &[f64]) -> Vec<Value> {
    let mut resolved: Vec<usize> = indices.iter().filter_map(|&i| resolve_index(i, items.len())).collect();
    resolved.sort_unstable();
    resolved.dedup();
    resolved.into_iter().map(|i| items[i].clone()).collect()
}

fn index_select_cbv(items: &[ContextBoundValue], indices: &[f64]) -> Vec<ContextBoundValue> {
    let mut resolved: Vec<usize> = indices.iter().filter_map(|&i| resolve_index(i, items.len())).collect();
    resolved.sort_unstable();
    resolved.dedup();
    resolved.into_iter().map(|i| items[i].clone()).collect()
}

/// Filter as a path step: consumes the whole threaded sequence as `L`,
/// preserving any CBV bindings on the surviving elements.
fn eval_filter_step(state: &EvalState, step: &Node, outer_ctx: &Rc<Context>, current: Vec<ContextBoundValue>) -> EvalResult<(Vec<ContextBoundValue>, bool)> {
    let items = expand_items(current);
    let predicate_node = match &step.rhs {
        None => return Ok((items, true)),
        Some(p) => p,
    };

    let collection = Value::Array(items.iter().map(|c| c.value.clone()).collect());
    let probe_ctx = outer_ctx.child(collection);
    // Per spec: "if P evaluates in L-context to a number" — a predicate
    // that isn't actually index-shaped (e.g. `v > 2` auto-mapping `v` over
    // the whole collection into an array, then comparing that to a number)
    // commonly doesn't even evaluate cleanly in L-context; that's just
    // "not a number", same as any other non-numeric probe result.
    let probe = engine::evaluate(state, predicate_node, &probe_ctx).ok();

    if let Some(indices) = probe.as_ref().and_then(numeric_indices) {
        let selected = index_select_cbv(&items, &indices).into_iter().map(|c| c.rewrap_spent(c.value.clone())).collect();
        return Ok((selected, step.keep_array));
    }

    let mut out = Vec::new();
    for item in &items {
        let child_ctx = child_for_item(outer_ctx, item);
        let keep = engine::evaluate(state, predicate_node, &child_ctx)?;
        if is_truthy(&keep) {
            out.push(item.rewrap_spent(item.value.clone()));
        }
    }
    Ok((out, step.keep_array))
}

/// Standalone filter (spec §4.E "Filter `L[P]`"), used when a `Filter` node
/// is evaluated outside path-step threading.
pub fn eval_filter(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let collection = match &node.lhs {
        Some(lhs) => engine::evaluate(state, lhs, ctx)?,
        None => ctx.data.clone(),
    };
    eval_filter_on_value(state, node, collection, ctx)
}

/// Apply a `Filter` node's predicate/index/`[]` logic to an already-computed
/// collection, bypassing `node.lhs` entirely — used by `~> f()[…]` (spec
/// §4.F: "evaluate the call first... then apply the filter to its result
/// without re-running the call").
pub fn eval_filter_on_value(state: &EvalState, node: &Node, collection: Value, ctx: &Rc<Context>) -> EvalResult<Value> {
    let items: Vec<Value> = match &collection {
        Value::Array(items) => items.clone(),
        Value::Undefined => return Ok(Value::Undefined),
        other => vec![other.clone()],
    };

    let predicate_node = match &node.rhs {
        None => return Ok(Value::Array(items)),
        Some(p) => p,
    };

    let probe_ctx = ctx.child(Value::Array(items.clone()));
    let probe = engine::evaluate(state, predicate_node, &probe_ctx).ok();
    if let Some(indices) = probe.as_ref().and_then(numeric_indices) {
        return Ok(collapse(index_select(&items, &indices), node.keep_array));
    }

    let mut out = Vec::new();
    for item in &items {
        let child_ctx = ctx.array_item_child(item.clone());
        let keep = engine::evaluate(state, predicate_node, &child_ctx)?;
        if is_truthy(&keep) {
            out.push(item.clone());
        }
    }
    Ok(collapse(out, node.keep_array))
}

fn key_strings(value: &Value, position: usize) -> EvalResult<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                _ => Err(EvalError::object_key_not_string(position)),
            })
            .collect(),
        _ => Err(EvalError::object_key_not_string(position)),
    }
}

/// Literal-mode object constructor (spec §4.E): also used, unmodified, as
/// the per-item evaluation of a non-grouping object constructor following
/// an array path step (the generic per-item iterate branch calls straight
/// back into node dispatch, which lands here).
pub fn eval_object_constructor(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let mut result = OrderedObject::new();
    let mut owner_pair: AHashMap<String, usize> = AHashMap::default();
    for (pair_idx, (key_node, value_node)) in node.pairs.iter().enumerate() {
        let key_value = engine::evaluate(state, key_node, ctx)?;
        let keys = key_strings(&key_value, key_node.position)?;
        let value = engine::evaluate(state, value_node, ctx)?;
        if value.is_undefined() {
            continue;
        }
        for key in keys {
            if let Some(&prev_pair) = owner_pair.get(&key) {
                if prev_pair != pair_idx {
                    return Err(EvalError::duplicate_key(&key, node.position));
                }
            }
            owner_pair.insert(key.clone(), pair_idx);
            result.insert(key, value.clone());
        }
    }
    Ok(Value::Object(result))
}

/// Grouping-mode object constructor (spec §4.E, infix `^{…}` / a merging
/// path RHS — `step.is_grouping`): groups items by per-pair key, running
/// the value expression once per group with `$` equal to the single item
/// (group size 1) or the group array.
fn eval_grouping_constructor(state: &EvalState, node: &Node, outer_ctx: &Rc<Context>, items: &[ContextBoundValue]) -> EvalResult<Value> {
    let mut result = OrderedObject::new();
    let mut owner_pair: AHashMap<String, usize> = AHashMap::default();

    for (pair_idx, (key_node, value_node)) in node.pairs.iter().enumerate() {
        let mut groups: IndexMap<String, Vec<Value>> = IndexMap::new();
        for item in items {
            let child_ctx = child_for_item(outer_ctx, item);
            let key_value = engine::evaluate(state, key_node, &child_ctx)?;
            let key = match key_value {
                Value::String(s) => s,
                _ => return Err(EvalError::object_key_not_string(key_node.position)),
            };
            groups.entry(key).or_default().push(item.step_input().clone());
        }

        for (key, mut group_items) in groups {
            let group_data = if group_items.len() == 1 {
                group_items.pop().unwrap()
            } else {
                Value::Array(group_items)
            };
            let child_ctx = outer_ctx.child(group_data);
            let value = engine::evaluate(state, value_node, &child_ctx)?;
            if value.is_undefined() {
                continue;
            }
            if let Some(&prev_pair) = owner_pair.get(&key) {
                if prev_pair != pair_idx {
                    return Err(EvalError::duplicate_key(&key, node.position));
                }
            }
            owner_pair.insert(key.clone(), pair_idx);
            result.insert(key, value);
        }
    }

    Ok(Value::Object(result))
}

/// Array constructor (spec §4.E): splice sub-results that are arrays unless
/// the sub-expression is itself an array literal; elide `Undefined`.
pub fn eval_array_constructor(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let mut out = Vec::with_capacity(node.expressions.len());
    for expr in &node.expressions {
        let value = engine::evaluate(state, expr, ctx)?;
        let is_literal_array = matches!(expr.kind, NodeKind::Array);
        match value {
            Value::Undefined => {}
            Value::Array(items) if !is_literal_array => out.extend(items),
            other => out.push(other),
        }
    }
    Ok(Value::Array(out))
}

/// `Sort` (spec §6.1 node kind; ordering per §4.C `compareValues`). A
/// stable sort preserves input order for equal keys (spec §8).
pub fn eval_sort(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let collection_node = node.lhs.as_ref().expect("Sort node requires a collection (lhs)");
    let collection = engine::evaluate(state, collection_node, ctx)?;
    let items: Vec<Value> = match collection {
        Value::Array(items) => items,
        Value::Undefined => return Ok(Value::Undefined),
        other => vec![other],
    };

    let mut keyed: Vec<(Value, Vec<Value>)> = Vec::with_capacity(items.len());
    for item in items {
        let item_ctx = ctx.array_item_child(item.clone());
        let mut keys = Vec::with_capacity(node.sort_terms.len());
        for term in &node.sort_terms {
            let key = engine::evaluate(state, &term.expr, &item_ctx)?;
            if !matches!(key, Value::Number(_) | Value::String(_) | Value::Undefined) {
                return Err(EvalError::sort_key_type(term.expr.position));
            }
            keys.push(key);
        }
        keyed.push((item, keys));
    }

    for pos in 0..node.sort_terms.len() {
        let saw_number = keyed.iter().any(|(_, k)| matches!(k.get(pos), Some(Value::Number(_))));
        let saw_string = keyed.iter().any(|(_, k)| matches!(k.get(pos), Some(Value::String(_))));
        if saw_number && saw_string {
            return Err(EvalError::sort_key_mixed_types(node.position));
        }
    }

    keyed.sort_by(|a, b| {
        for (i, term) in node.sort_terms.iter().enumerate() {
            let ord = compare_values(&a.1[i], &b.1[i]);
            let ord = if term.descending { ord.reverse() } else { ord };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });

    Ok(collapse(keyed.into_iter().map(|(v, _)| v).collect(), node.keep_array))
}

/// Evaluate one path step against the threaded CBV sequence, dispatching
/// to the specialised handling grouping/filter/context-bind need.
fn eval_step(state: &EvalState, step: &Node, outer_ctx: &Rc<Context>, current: Vec<ContextBoundValue>) -> EvalResult<(Vec<ContextBoundValue>, bool)> {
    match step.kind {
        NodeKind::Object if step.is_grouping => {
            let items = expand_items(current);
            let grouped = eval_grouping_constructor(state, step, outer_ctx, &items)?;
            Ok((vec![ContextBoundValue::new(grouped)], step.keep_array))
        }
        NodeKind::Filter => eval_filter_step(state, step, outer_ctx, current),
        NodeKind::Context => crate::engine::context_ops::eval_context_bind_step(step, outer_ctx, current),
        NodeKind::Index => crate::engine::context_ops::eval_index_bind_step(step, current),
        _ => eval_generic_step(state, step, outer_ctx, current),
    }
}

/// `Path` dispatch (spec §4.E "Path step `A.B`"): the first step evaluates
/// once in the caller's context; each later step threads the previous
/// step's `ContextBoundValue` sequence through `eval_step`. Singleton
/// collapse applies once, to the whole chain's final sequence.
pub fn eval_path(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let mut steps = node.expressions.iter();
    let first = match steps.next() {
        Some(first) => first,
        None => return Ok(ctx.data.clone()),
    };

    let (mut current, mut keep_array_chain) = if first.kind == NodeKind::Object && first.is_grouping {
        let items = expand_items(vec![ContextBoundValue::new(ctx.data.clone())]);
        let grouped = eval_grouping_constructor(state, first, ctx, &items)?;
        (vec![ContextBoundValue::new(grouped)], first.keep_array)
    } else {
        let first_value = engine::evaluate(state, first, ctx)?;
        (vec![ContextBoundValue::new(first_value)], first.keep_array)
    };

    for step in steps {
        if is_undefined_single(&current) {
            break;
        }
        let (next, step_keep) = eval_step(state, step, ctx, current)?;
        current = next;
        keep_array_chain = keep_array_chain || step_keep;
    }

    let values: Vec<Value> = current.into_iter().map(|c| c.value).collect();
    Ok(collapse(values, keep_array_chain || node.keep_array))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvalOptions;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_lookup_field_on_object() {
        let mut obj = OrderedObject::new();
        obj.insert("a".into(), num(1.0));
        assert_eq!(lookup_field(&Value::Object(obj), "a"), num(1.0));
    }

    #[test]
    fn test_lookup_field_maps_over_array_and_elides_undefined() {
        let mut with_a = OrderedObject::new();
        with_a.insert("a".into(), num(1.0));
        let without_a = OrderedObject::new();
        let arr = Value::Array(vec![Value::Object(with_a), Value::Object(without_a)]);
        assert_eq!(lookup_field(&arr, "a"), num(1.0));
    }

    #[test]
    fn test_lookup_field_missing_is_undefined() {
        let arr = Value::Array(vec![]);
        assert_eq!(lookup_field(&arr, "a"), Value::Undefined);
    }

    #[test]
    fn test_collapse_rules() {
        assert_eq!(collapse(vec![], false), Value::Undefined);
        assert_eq!(collapse(vec![num(1.0)], false), num(1.0));
        assert_eq!(collapse(vec![num(1.0)], true), Value::Array(vec![num(1.0)]));
        assert_eq!(collapse(vec![num(1.0), num(2.0)], false), Value::Array(vec![num(1.0), num(2.0)]));
    }

    #[test]
    fn test_wildcard_flattens_one_level() {
        let mut obj = OrderedObject::new();
        obj.insert("a".into(), Value::Array(vec![num(1.0), num(2.0)]));
        obj.insert("b".into(), num(3.0));
        let result = eval_wildcard(&Value::Object(obj));
        assert_eq!(result, Value::Array(vec![num(1.0), num(2.0), num(3.0)]));
    }

    #[test]
    fn test_index_select_negative_and_sorted() {
        let items = vec![num(10.0), num(20.0), num(30.0)];
        assert_eq!(index_select(&items, &[-1.0, 0.0]), vec![num(10.0), num(30.0)]);
    }

    #[test]
    fn test_eval_path_singleton_collapse() {
        let state = EvalState::new(EvalOptions::default());
        let mut item = OrderedObject::new();
        item.insert("v".into(), num(9.0));
        let mut outer = OrderedObject::new();
        outer.insert("a".into(), Value::Array(vec![Value::Object(item)]));
        let ctx = Context::new_root(Value::Object(outer));

        let path = Node {
            expressions: vec![
                Node::new(NodeKind::Name, 0).with_value(crate::ast::NodeValue::Str("a".into())),
                Node::new(NodeKind::Name, 1).with_value(crate::ast::NodeValue::Str("v".into())),
            ],
            ..Node::new(NodeKind::Path, 0)
        };
        let result = eval_path(&state, &path, &ctx).unwrap();
        assert_eq!(result, num(9.0));
    }
}
