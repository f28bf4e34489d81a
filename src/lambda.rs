//! Lambdas and calls (spec §3.3/§4.F): closure capture, signature validation
//! and auto-wrapping, built-in dispatch, partial application, the TCO
//! trampoline, and `~>` apply/composition. Grounded on the teacher's
//! `evaluator/mod.rs` dispatch loop for the call-and-trampoline shape; the
//! teacher has no closures or TCO of its own (`RLogic` is a flat boolean
//! rule language), so the recursion machinery here is new, built in the same
//! `Rc`/`RefCell` idiom the teacher uses for `TrackedData`.

use std::rc::Rc;

use crate::ast::{Node, NodeKind};
use crate::builtins::BuiltinFn;
use crate::coerce::to_concat_string;
use crate::context::Context;
use crate::engine::{self, path, EvalState};
use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// A parsed parameter-signature entry (spec §3.3 "optional parameter
/// signature"). Supports the type letters JSONata signatures use for
/// user-defined lambdas: `n`(umber) `s`(tring) `b`(oolean) `a`(rray)
/// `o`(bject) `f`(unction) `j`/`x`(any), each optionally suffixed `?`.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub type_code: char,
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct Signature {
    pub params: Vec<ParamSpec>,
    pub raw: String,
}

impl Signature {
    /// Parse a signature body between `<` and `>` (a leading/trailing
    /// return-type segment after `:` is accepted and ignored — the core
    /// does not enforce return types).
    pub fn parse(raw: &str, position: usize) -> EvalResult<Signature> {
        let body = raw.trim().trim_start_matches('<').trim_end_matches('>');
        let params_part = body.split(':').next().unwrap_or("");
        let mut params = Vec::new();
        let mut chars = params_part.chars().peekable();
        while let Some(c) = chars.next() {
            if !"nsboafjx".contains(c) {
                return Err(EvalError::invalid_signature(
                    format!("unsupported signature type code '{c}'"),
                    position,
                ));
            }
            let optional = matches!(chars.peek(), Some('?'));
            if optional {
                chars.next();
            }
            params.push(ParamSpec { type_code: c, optional });
        }
        Ok(Signature { params, raw: raw.to_string() })
    }

    pub fn required(&self) -> usize {
        self.params.iter().filter(|p| !p.optional).count()
    }

    pub fn total(&self) -> usize {
        self.params.len()
    }
}

/// What a `Lambda` value actually calls. User-defined lambdas carry a body
/// tree and captured context (spec §3.3); `~>` composition and partial
/// application produce lambdas with no body of their own — their "body" is
/// a dispatch to other function values (spec §4.F).
#[derive(Clone)]
pub enum LambdaBody {
    Expr {
        body: Rc<Node>,
        captured: Rc<Context>,
    },
    /// `f ~> g` where both sides are functions: `λx.g(f(x))`.
    Composed {
        f: Value,
        g: Value,
    },
    /// A partial application: `bound[i] = None` marks a `?` placeholder
    /// filled from the new lambda's own parameter list, in order.
    Partial {
        target: Value,
        bound: Vec<Option<Value>>,
    },
}

pub struct Lambda {
    pub params: Vec<String>,
    pub signature: Option<Signature>,
    pub body: LambdaBody,
}

impl Lambda {
    pub fn new_expr(params: Vec<String>, signature: Option<Signature>, body: Rc<Node>, captured: Rc<Context>) -> Self {
        Self {
            params,
            signature,
            body: LambdaBody::Expr { body, captured },
        }
    }

    pub fn new_composed(f: Value, g: Value) -> Self {
        Self {
            params: vec!["$x".to_string()],
            signature: None,
            body: LambdaBody::Composed { f, g },
        }
    }

    pub fn new_partial(target: Value, bound: Vec<Option<Value>>) -> Self {
        let placeholder_count = bound.iter().filter(|a| a.is_none()).count();
        let params = (0..placeholder_count).map(|i| format!("$_partial{i}")).collect();
        Self {
            params,
            signature: None,
            body: LambdaBody::Partial { target, bound },
        }
    }

    /// A short label for diagnostics/`$string` (spec §4.C stringification).
    pub fn signature_text(&self) -> String {
        format!("λ({})", self.params.join(", "))
    }
}

/// An in-flight tail call: the trampoline in `call_lambda_trampoline`
/// rebinds and re-enters instead of growing the host stack (spec §3.5).
pub struct TcoThunk {
    pub lambda: Rc<Lambda>,
    pub args: Vec<Value>,
}

/// The result of evaluating a tail-position expression: either a finished
/// value, or a deferred call the enclosing trampoline must drive.
pub enum CallOutcome {
    Value(Value),
    Tail(TcoThunk),
}

/// Bind `args` to `lambda.params` per spec §4.F: any `Undefined` argument
/// short-circuits the whole call; a signature (if present) bounds arity and
/// auto-wraps array-typed parameters; without one, extra arguments error and
/// missing ones bind to `Undefined`.
fn bind_params(lambda: &Lambda, mut args: Vec<Value>, position: usize) -> EvalResult<Option<Vec<(String, Value)>>> {
    if args.iter().any(Value::is_undefined) {
        return Ok(None);
    }
    if let Some(sig) = &lambda.signature {
        if args.len() < sig.required() || args.len() > sig.total() {
            return Err(EvalError::arity(&lambda.signature_text(), position));
        }
        for (i, spec) in sig.params.iter().enumerate() {
            if spec.type_code == 'a' {
                if let Some(value) = args.get_mut(i) {
                    if !value.is_array() {
                        *value = Value::Array(vec![std::mem::replace(value, Value::Undefined)]);
                    }
                }
            }
        }
        while args.len() < sig.total() {
            args.push(Value::Undefined);
        }
    } else if args.len() > lambda.params.len() {
        return Err(EvalError::arity(&lambda.signature_text(), position));
    } else {
        while args.len() < lambda.params.len() {
            args.push(Value::Undefined);
        }
    }
    Ok(Some(lambda.params.iter().cloned().zip(args).collect()))
}

/// Call `lambda` with `args`. When `tail` is true and the body's own
/// evaluation lands on another lambda call in tail position, this returns
/// `CallOutcome::Tail` instead of recursing — only `call_lambda_trampoline`
/// (the owner of the call site) is allowed to consume that thunk.
pub fn call_lambda(
    state: &EvalState,
    lambda: &Rc<Lambda>,
    args: Vec<Value>,
    position: usize,
    tail: bool,
) -> EvalResult<CallOutcome> {
    match &lambda.body {
        LambdaBody::Expr { body, captured } => {
            let bound = match bind_params(lambda, args, position)? {
                None => return Ok(CallOutcome::Value(Value::Undefined)),
                Some(bound) => bound,
            };
            let call_ctx = captured.child(captured.data.clone());
            for (name, value) in bound {
                call_ctx.set_binding(name, value);
            }
            engine::eval_tail(state, body, &call_ctx, tail)
        }
        LambdaBody::Composed { f, g } => {
            let intermediate = apply_function(state, f, args, position)?;
            Ok(CallOutcome::Value(apply_function(state, g, vec![intermediate], position)?))
        }
        LambdaBody::Partial { target, bound } => {
            let mut supplied = args.into_iter();
            let mut full_args = Vec::with_capacity(bound.len());
            for slot in bound {
                match slot {
                    Some(value) => full_args.push(value.clone()),
                    None => full_args.push(supplied.next().unwrap_or(Value::Undefined)),
                }
            }
            Ok(CallOutcome::Value(apply_function(state, target, full_args, position)?))
        }
    }
}

/// Drive `lambda`/`args` to completion, looping on any `TcoThunk` the body
/// returns instead of growing the host stack (spec §3.5/§4.F).
pub fn call_lambda_trampoline(
    state: &EvalState,
    lambda: &Rc<Lambda>,
    args: Vec<Value>,
    position: usize,
) -> EvalResult<Value> {
    let mut current_lambda = lambda.clone();
    let mut current_args = args;
    loop {
        match call_lambda(state, &current_lambda, current_args, position, true)? {
            CallOutcome::Value(value) => return Ok(value),
            CallOutcome::Tail(thunk) => {
                current_lambda = thunk.lambda;
                current_args = thunk.args;
            }
        }
    }
}

/// Call any function value — `Lambda` (via the trampoline) or `BuiltinFn`
/// (directly) — from a non-tail call site (operands, `~>`, composition,
/// partial-application targets). The current context is only meaningful to
/// built-ins with `accepts_context`; callers that have no context handy
/// (composition/partial invoked outside a path) pass the lambda's own
/// captured/root context.
pub fn apply_function(state: &EvalState, func: &Value, args: Vec<Value>, position: usize) -> EvalResult<Value> {
    match func {
        Value::Lambda(lambda) => call_lambda_trampoline(state, lambda, args, position),
        Value::BuiltinFn(builtin) => call_builtin(state, builtin, &Context::new_root(Value::Undefined), args, position),
        _ => Err(EvalError::unknown_function("<value>", position)),
    }
}

/// Call a function value with an explicit context (path/filter call sites
/// that know the current `$`, needed for `accepts_context` built-ins).
pub fn apply_function_in_context(
    state: &EvalState,
    func: &Value,
    ctx: &Rc<Context>,
    args: Vec<Value>,
    position: usize,
) -> EvalResult<Value> {
    match func {
        Value::Lambda(lambda) => call_lambda_trampoline(state, lambda, args, position),
        Value::BuiltinFn(builtin) => call_builtin(state, builtin, ctx, args, position),
        _ => Err(EvalError::unknown_function("<value>", position)),
    }
}

fn call_builtin(state: &EvalState, builtin: &Rc<BuiltinFn>, ctx: &Rc<Context>, mut args: Vec<Value>, position: usize) -> EvalResult<Value> {
    if builtin.accepts_context && args.len() < builtin.arity.min {
        args.insert(0, ctx.data.clone());
    }
    if !builtin.arity.in_bounds(args.len()) {
        return Err(EvalError::arity(&builtin.name, position));
    }
    builtin.call(state, ctx, &args)
}

/// `~>` (spec §4.F): `left` has already been evaluated; `rhs_node` is the
/// unevaluated right side, since it needs different treatment depending on
/// its syntactic shape rather than its value:
///   - a transform literal (`|path|update|delete|`) applies to `left` as its
///     input, rather than to `ctx.data`;
///   - a regex literal matches `left` (coerced to a string) and yields a
///     boolean;
///   - a filter wrapping a function call (`f(...)[predicate]`) evaluates the
///     call once with `left` prepended, then filters the *result* — the
///     call itself is never re-run against `left` a second time;
///   - otherwise the right side is evaluated to a function value and either
///     composed with `left` (if `left` is also a function, spec's `f ~> g`
///     composition) or applied to `left` as its sole argument.
pub fn eval_apply(state: &EvalState, left: Value, rhs_node: &Node, ctx: &Rc<Context>, position: usize) -> EvalResult<Value> {
    match rhs_node.kind {
        NodeKind::Transform => crate::transform::eval_transform_on(state, rhs_node, &left, ctx),
        NodeKind::Regex => {
            let pattern = rhs_node.name().unwrap_or_default();
            let compiled = crate::regex_pool::compile(pattern)
                .map_err(|e| EvalError::invalid_signature(e.to_string(), position))?;
            Ok(Value::Bool(compiled.is_match(&to_concat_string(&left))))
        }
        NodeKind::Filter => eval_apply_filter(state, left, rhs_node, ctx, position),
        _ => {
            let right = engine::evaluate(state, rhs_node, ctx)?;
            if left.is_function() && right.is_function() {
                Ok(Value::Lambda(Rc::new(Lambda::new_composed(left, right))))
            } else {
                apply_function_in_context(state, &right, ctx, vec![left], position)
            }
        }
    }
}

/// The `f(...)[predicate] ~>`-style right side: `rhs_node.lhs` is the call
/// to run with `left` prepended; its own result (not `left`) is what the
/// filter then runs over.
fn eval_apply_filter(state: &EvalState, left: Value, rhs_node: &Node, ctx: &Rc<Context>, position: usize) -> EvalResult<Value> {
    let called = match &rhs_node.lhs {
        Some(call_node) if call_node.kind == NodeKind::Function => {
            let callee = engine::evaluate(state, call_node.lhs.as_ref().expect("Function node requires callee"), ctx)?;
            let mut args = vec![left];
            for arg in &call_node.arguments {
                args.push(engine::evaluate(state, arg, ctx)?);
            }
            apply_function_in_context(state, &callee, ctx, args, position)?
        }
        Some(other) => engine::evaluate(state, other, ctx)?,
        None => left,
    };
    path::eval_filter_on_value(state, rhs_node, called, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_parse_required_and_total() {
        let sig = Signature::parse("<n-s?>", 0).unwrap();
        assert_eq!(sig.required(), 1);
        assert_eq!(sig.total(), 2);
    }

    #[test]
    fn test_signature_rejects_unknown_code() {
        assert!(Signature::parse("<z>", 0).is_err());
    }

    #[test]
    fn test_bind_params_short_circuits_on_undefined() {
        let lambda = Lambda::new_expr(
            vec!["$a".into(), "$b".into()],
            None,
            Rc::new(Node::new(crate::ast::NodeKind::Null, 0)),
            Context::new_root(Value::Null),
        );
        let result = bind_params(&lambda, vec![Value::Number(1.0), Value::Undefined], 0).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_bind_params_without_signature_pads_missing() {
        let lambda = Lambda::new_expr(
            vec!["$a".into(), "$b".into()],
            None,
            Rc::new(Node::new(crate::ast::NodeKind::Null, 0)),
            Context::new_root(Value::Null),
        );
        let bound = bind_params(&lambda, vec![Value::Number(1.0)], 0).unwrap().unwrap();
        assert_eq!(bound[1].1, Value::Undefined);
    }

    #[test]
    fn test_bind_params_rejects_extra_args_without_signature() {
        let lambda = Lambda::new_expr(
            vec!["$a".into()],
            None,
            Rc::new(Node::new(crate::ast::NodeKind::Null, 0)),
            Context::new_root(Value::Null),
        );
        let result = bind_params(&lambda, vec![Value::Number(1.0), Value::Number(2.0)], 0);
        assert!(result.is_err());
    }
}
