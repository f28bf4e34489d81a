//! The built-in function contract (spec §6.2). The core dispatches calls to
//! whatever is registered here; it does not implement `$sum`, `$map`, etc.
//! itself — those are external collaborators, named only by this contract.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::context::Context;
use crate::engine::EvalState;
use crate::error::EvalResult;
use crate::value::Value;

/// Declared arity. `max = None` means variadic.
#[derive(Debug, Clone, Copy)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub fn fixed(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    pub fn range(min: usize, max: usize) -> Self {
        Self { min, max: Some(max) }
    }

    pub fn variadic(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn in_bounds(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

type BuiltinImpl = dyn Fn(&EvalState, &Rc<Context>, &[Value]) -> EvalResult<Value>;

/// A registered built-in function (spec §6.2 contract).
pub struct BuiltinFn {
    pub name: String,
    pub arity: Arity,
    /// If true, and the call arrives with fewer than `arity.min` args, the
    /// current `$` is prepended as the first argument.
    pub accepts_context: bool,
    implementation: Box<BuiltinImpl>,
}

impl BuiltinFn {
    pub fn new(
        name: impl Into<String>,
        arity: Arity,
        accepts_context: bool,
        implementation: impl Fn(&EvalState, &Rc<Context>, &[Value]) -> EvalResult<Value> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            accepts_context,
            implementation: Box::new(implementation),
        }
    }

    pub fn call(&self, state: &EvalState, ctx: &Rc<Context>, args: &[Value]) -> EvalResult<Value> {
        (self.implementation)(state, ctx, args)
    }
}

impl fmt::Debug for BuiltinFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinFn").field("name", &self.name).finish()
    }
}

/// A host-supplied map from function name to implementation (spec §6.4
/// "optional custom-function registry"), grounded on the teacher's
/// `ahash`-backed hash sets (`array_ops.rs::eval_in`).
#[derive(Default)]
pub struct Registry {
    functions: AHashMap<String, Rc<BuiltinFn>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, f: BuiltinFn) {
        self.functions.insert(f.name.clone(), Rc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Rc<BuiltinFn>> {
        self.functions.get(name).cloned()
    }
}
