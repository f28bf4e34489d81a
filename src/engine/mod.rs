//! Central dispatch over syntactic node kinds (spec §4 overview) plus the
//! per-call evaluation state: live-depth counter, deadline, logger and
//! built-in registry access. Grounded on the teacher's `evaluator/mod.rs`
//! dispatch loop and `jsoneval/cancellation.rs`'s cooperative-cancellation
//! check, generalized from JSON-Logic operator dispatch to the full
//! JSONata-dialect node set.

pub mod context_ops;
pub mod operators;
pub mod path;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::ast::{Node, NodeKind};
use crate::builtins::Registry;
use crate::config::EvalOptions;
use crate::context::Context;
use crate::error::{EvalError, EvalResult};
use crate::lambda::{self, CallOutcome, Lambda, Signature, TcoThunk};
use crate::value::{is_truthy, Value};

/// Per-call evaluation state (spec §5): owns the live-depth counter and
/// deadline for exactly one `Eval`/`EvalWithBindings` invocation.
pub struct EvalState {
    options: EvalOptions,
    depth: Cell<usize>,
    deadline: Option<Instant>,
}

impl EvalState {
    pub fn new(options: EvalOptions) -> Self {
        let deadline = options.timeout.map(|d| Instant::now() + d);
        Self {
            options,
            depth: Cell::new(0),
            deadline,
        }
    }

    pub fn registry(&self) -> Option<&Rc<Registry>> {
        self.options.registry.as_ref()
    }

    pub fn log(&self, message: &str) {
        if let Some(logger) = &self.options.logger {
            logger.log(message);
        }
    }

    fn check_budget(&self, position: usize) -> EvalResult<()> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(EvalError::timed_out(position));
            }
        }
        Ok(())
    }

    /// Enter a node: check cancellation/timeout, bump the live-depth
    /// counter, fail past the configured maximum. The returned guard
    /// decrements the counter on drop, so depth tracks live recursion, not
    /// total node visits (spec §4.F recursion guard).
    fn enter(&self, position: usize) -> EvalResult<DepthGuard<'_>> {
        self.check_budget(position)?;
        let depth = self.depth.get() + 1;
        if depth > self.options.max_depth {
            return Err(EvalError::depth_exceeded(position));
        }
        self.depth.set(depth);
        Ok(DepthGuard { state: self })
    }
}

struct DepthGuard<'a> {
    state: &'a EvalState,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.state.depth.set(self.state.depth.get() - 1);
    }
}

/// Evaluate `node` in `ctx` to a final, non-tail value — the entry point
/// every non-tail call site uses (operands, function arguments, path
/// steps). Any `TcoThunk` a tail-position sub-evaluation would have
/// produced is resolved eagerly here via the trampoline.
pub fn evaluate(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    match eval_tail(state, node, ctx, false)? {
        CallOutcome::Value(value) => Ok(unwrap_cbv(value)),
        CallOutcome::Tail(thunk) => {
            Ok(unwrap_cbv(lambda::call_lambda_trampoline(state, &thunk.lambda, thunk.args, node.position)?))
        }
    }
}

/// Strip a `ContextBoundValue` that reached a non-path consumer (spec §3.4:
/// "before any value reaches a user-level operator... CBVs must be
/// recursively unwrapped"). CBVs never nest inside `Value` itself, so this
/// only matters at the path-engine/operator boundary; kept as a single
/// choke point so every evaluation exit passes through it.
fn unwrap_cbv(value: Value) -> Value {
    value
}

/// The tail-aware dispatcher. `tail` is true only at: the lambda body
/// position, the taken branch of a `Condition`, and the last expression of
/// a `Block` (spec §4.F "tail positions"). Only a `Function` node resolving
/// to a user-defined `Lambda` produces `CallOutcome::Tail`; every other
/// node kind always yields `CallOutcome::Value`.
pub fn eval_tail(state: &EvalState, node: &Node, ctx: &Rc<Context>, tail: bool) -> EvalResult<CallOutcome> {
    let _guard = state.enter(node.position)?;
    match node.kind {
        NodeKind::Str => Ok(value_str(node)),
        NodeKind::Num => Ok(value_num(node)),
        NodeKind::Bool => Ok(value_bool(node)),
        NodeKind::Null => Ok(CallOutcome::Value(Value::Null)),

        NodeKind::Name => {
            let name = node.name().unwrap_or_default();
            Ok(CallOutcome::Value(path::lookup_field(&ctx.data, name)))
        }

        NodeKind::Variable => Ok(CallOutcome::Value(eval_variable(state, node, ctx))),

        NodeKind::Regex => {
            let pattern = node.name().unwrap_or_default();
            let compiled = crate::regex_pool::compile(pattern)
                .map_err(|e| EvalError::invalid_signature(e.to_string(), node.position))?;
            Ok(CallOutcome::Value(Value::Regex(compiled)))
        }

        NodeKind::Path => Ok(CallOutcome::Value(path::eval_path(state, node, ctx)?)),
        NodeKind::Descendant => Ok(CallOutcome::Value(path::eval_descendant(state, node, ctx)?)),
        NodeKind::Wildcard => Ok(CallOutcome::Value(path::eval_wildcard(&ctx.data))),
        NodeKind::Filter => Ok(CallOutcome::Value(path::eval_filter(state, node, ctx)?)),
        NodeKind::Array => Ok(CallOutcome::Value(path::eval_array_constructor(state, node, ctx)?)),
        NodeKind::Object => Ok(CallOutcome::Value(path::eval_object_constructor(state, node, ctx)?)),
        NodeKind::Sort => Ok(CallOutcome::Value(path::eval_sort(state, node, ctx)?)),

        NodeKind::Binary => Ok(CallOutcome::Value(operators::eval_binary(state, node, ctx)?)),
        NodeKind::Unary => Ok(CallOutcome::Value(operators::eval_unary(state, node, ctx)?)),

        NodeKind::Condition => eval_condition(state, node, ctx, tail),
        NodeKind::Block => eval_block(state, node, ctx, tail),

        NodeKind::Lambda => Ok(CallOutcome::Value(eval_lambda_literal(node, ctx)?)),
        NodeKind::Bind => Ok(CallOutcome::Value(eval_bind(state, node, ctx)?)),

        NodeKind::Function => eval_function_call(state, node, ctx, tail),
        NodeKind::Partial => Ok(CallOutcome::Value(eval_partial(state, node, ctx)?)),
        NodeKind::Placeholder => Err(EvalError::invalid_signature("unbound '?' placeholder", node.position)),

        NodeKind::Transform => Ok(CallOutcome::Value(crate::transform::eval_transform(state, node, ctx)?)),
        NodeKind::Parent => Ok(CallOutcome::Value(
            ctx.parent_target().ok_or_else(|| EvalError::invalid_parent(node.position))?,
        )),
        NodeKind::Context => Ok(CallOutcome::Value(context_ops::eval_context_bind(state, node, ctx)?)),
        NodeKind::Index => Ok(CallOutcome::Value(context_ops::eval_index_bind(state, node, ctx)?)),
    }
}

fn value_str(node: &Node) -> CallOutcome {
    CallOutcome::Value(Value::String(node.name().unwrap_or_default().to_string()))
}

fn value_num(node: &Node) -> CallOutcome {
    let n = node.value.as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0);
    CallOutcome::Value(Value::Number(n))
}

fn value_bool(node: &Node) -> CallOutcome {
    let b = node.value.as_ref().and_then(|v| v.as_bool()).unwrap_or(false);
    CallOutcome::Value(Value::Bool(b))
}

/// A bare name (not `$` or `$$`) first resolves against the context chain's
/// bindings; a host-registered built-in of the same name (spec §6.2/§6.4) is
/// the fallback, so a user `$bind` always shadows a built-in of the same
/// name rather than the other way around.
fn eval_variable(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> Value {
    match node.name().unwrap_or_default() {
        "" => ctx.data.clone(),
        "$" => ctx.root_data(),
        name => match ctx.get_binding(name) {
            Some(value) => value,
            None => state
                .registry()
                .and_then(|registry| registry.get(name))
                .map(Value::BuiltinFn)
                .unwrap_or(Value::Undefined),
        },
    }
}

fn eval_condition(state: &EvalState, node: &Node, ctx: &Rc<Context>, tail: bool) -> EvalResult<CallOutcome> {
    let cond_node = node.lhs.as_ref().expect("Condition node requires a condition (lhs)");
    let cond = evaluate(state, cond_node, ctx)?;
    if is_truthy(&cond) {
        let then_node = node.rhs.as_ref().expect("Condition node requires a then-branch (rhs)");
        eval_tail(state, then_node, ctx, tail)
    } else {
        match &node.else_branch {
            Some(else_node) => eval_tail(state, else_node, ctx, tail),
            None => Ok(CallOutcome::Value(Value::Undefined)),
        }
    }
}

fn eval_block(state: &EvalState, node: &Node, ctx: &Rc<Context>, tail: bool) -> EvalResult<CallOutcome> {
    let block_ctx = ctx.child(ctx.data.clone());
    let mut result = CallOutcome::Value(Value::Undefined);
    for (i, expr) in node.expressions.iter().enumerate() {
        let is_last = i + 1 == node.expressions.len();
        if is_last {
            result = eval_tail(state, expr, &block_ctx, tail)?;
        } else {
            evaluate(state, expr, &block_ctx)?;
        }
    }
    Ok(result)
}

fn eval_lambda_literal(node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let signature = match &node.signature {
        Some(raw) => Some(Signature::parse(raw, node.position)?),
        None => None,
    };
    let body = node.rhs.clone().ok_or_else(|| EvalError::invalid_signature("lambda has no body", node.position))?;
    let lambda = Lambda::new_expr(node.params.clone(), signature, Rc::new(*body), ctx.clone());
    Ok(Value::Lambda(Rc::new(lambda)))
}

fn eval_bind(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let name = node.name().unwrap_or_default();
    let value_node = node.rhs.as_ref().expect("Bind node requires a value expression (rhs)");
    let value = evaluate(state, value_node, ctx)?;
    ctx.set_binding(name, value.clone());
    Ok(value)
}

fn resolve_callee(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let proc_node = node.lhs.as_ref().expect("Function/Partial node requires a callee (lhs)");
    let value = evaluate(state, proc_node, ctx)?;
    if !value.is_function() {
        let name = proc_node.name().unwrap_or("<expression>");
        return Err(EvalError::unknown_function(name, node.position));
    }
    Ok(value)
}

fn eval_function_call(state: &EvalState, node: &Node, ctx: &Rc<Context>, tail: bool) -> EvalResult<CallOutcome> {
    let callee = resolve_callee(state, node, ctx)?;
    let args = node
        .arguments
        .iter()
        .map(|a| evaluate(state, a, ctx))
        .collect::<EvalResult<Vec<_>>>()?;
    match callee {
        Value::Lambda(lambda) => {
            if tail {
                Ok(CallOutcome::Tail(TcoThunk { lambda, args }))
            } else {
                Ok(CallOutcome::Value(lambda::call_lambda_trampoline(state, &lambda, args, node.position)?))
            }
        }
        other => Ok(CallOutcome::Value(lambda::apply_function_in_context(state, &other, ctx, args, node.position)?)),
    }
}

fn eval_partial(state: &EvalState, node: &Node, ctx: &Rc<Context>) -> EvalResult<Value> {
    let callee = resolve_callee(state, node, ctx)?;
    let mut bound = Vec::with_capacity(node.arguments.len());
    for arg in &node.arguments {
        if arg.kind == NodeKind::Placeholder {
            bound.push(None);
        } else {
            bound.push(Some(evaluate(state, arg, ctx)?));
        }
    }
    if !matches!(callee, Value::Lambda(_)) {
        return Err(EvalError::partial_non_function(node.position));
    }
    Ok(Value::Lambda(Rc::new(Lambda::new_partial(callee, bound))))
}
