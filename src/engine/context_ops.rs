//! Context-carrying operators (spec §4.G): `#$i` positional bind, `@$x`
//! context bind (cross-join), and the `%` parent operator (the latter is
//! implemented directly on `Context::parent_target`, called from
//! `engine::eval_tail`'s `Parent` arm). Grounded on the teacher's
//! `data_wrapper.rs`, whose `TrackedData` similarly threads extra
//! bookkeeping (a version counter) alongside a value without the consumer
//! needing to know.

use std::rc::Rc;

use crate::ast::Node;
use crate::cbv::ContextBoundValue;
use crate::context::Context;
use crate::engine::{self, path, EvalState};
use crate::error::EvalResult;
use crate::value::Value;

/// `#$i` as a path step: wrap each element of the threaded sequence with
/// `bindings[i] = index` (0-based), per spec §4.G.
pub fn eval_index_bind_step(step: &Node, current: Vec<ContextBoundValue>) -> EvalResult<(Vec<ContextBoundValue>, bool)> {
    let name = step.name().unwrap_or_default();
    let items = path::expand_items(current);
    let out = items
        .into_iter()
        .enumerate()
        .map(|(i, cbv)| {
            let value = cbv.value.clone();
            let mut rewrapped = cbv.rewrap(value);
            rewrapped.bindings.insert(name.to_string(), Value::Number(i as f64));
            rewrapped
        })
        .collect();
    Ok((out, false))
}

/// `@$x` as a path step: wrap each element with `bindings[x] = element`
/// and a rewind-parent of the data the LHS was resolved from, so the next
/// path step iterates that rewind-parent while `$x` stays bound to the
/// current row (spec §4.G cross-join).
pub fn eval_context_bind_step(step: &Node, outer_ctx: &Rc<Context>, current: Vec<ContextBoundValue>) -> EvalResult<(Vec<ContextBoundValue>, bool)> {
    let name = step.name().unwrap_or_default();
    let rewind = outer_ctx.data.clone();
    let items = path::expand_items(current);
    let out = items
        .into_iter()
        .map(|cbv| {
            let element = cbv.value.clone();
            let mut rewrapped = cbv.rewrap(element.clone());
            rewrapped.bindings.insert(name.to_string(), element);
            rewrapped.rewind_parent = Some(rewind.clone());
            rewrapped
        })
        .collect();
    Ok((out, false))
}

/// Standalone `@$x`/`#$i` (not part of a `Path`'s step list): binds the
/// name against the current `$` and returns the plain value, since there is
/// no subsequent path step for the binding to carry forward to.
pub fn eval_context_bind(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let name = node.name().unwrap_or_default();
    let value = match &node.lhs {
        Some(lhs) => engine::evaluate(state, lhs, ctx)?,
        None => ctx.data.clone(),
    };
    ctx.set_binding(name, value.clone());
    Ok(value)
}

pub fn eval_index_bind(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let name = node.name().unwrap_or_default();
    let value = match &node.lhs {
        Some(lhs) => engine::evaluate(state, lhs, ctx)?,
        None => ctx.data.clone(),
    };
    ctx.set_binding(name, Value::Number(0.0));
    let _ = name;
    Ok(value)
}
