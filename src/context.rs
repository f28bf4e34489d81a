//! The evaluation context chain (spec §3.2/§4.B).
//!
//! A context is a cons-cell carrying the current `$`, a shortcut to the
//! outermost `$$` context, the enclosing parent (walked by `%` and by name
//! resolution), a lazily-allocated bindings map, and the `is_array_item`
//! marker that makes `%` observable. Contexts are reference-counted so a
//! lambda can capture one directly (spec §3.3: "not cloned") and have it
//! outlive the stack frame that created it — grounded on the teacher's
//! `TrackedData`, which similarly wraps data behind a stable, shareable handle
//! with interior-mutable bookkeeping (there: `RwLock`/`AtomicU64`; here,
//! single-threaded per `Eval` call, so plain `RefCell`/`Cell` suffice).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::value::Value;

pub struct Context {
    /// The current `$`.
    pub data: Value,
    /// The enclosing context, if any.
    pub parent: Option<Rc<Context>>,
    /// Shortcut to the outermost context of this evaluation. A `Weak` handle
    /// is sufficient — and avoids a self-referential strong cycle on the
    /// root — because any context reachable from user code holds a strong
    /// `parent` chain all the way up to the real root.
    root: Weak<Context>,
    /// Lazily-allocated variable bindings visible from this context.
    bindings: RefCell<Option<IndexMap<String, Value>>>,
    /// True iff this context was created by iterating an array element
    /// inside a path step. Only such contexts are valid `%` targets.
    pub is_array_item: bool,
    /// Parent-object override for `%`, set when this context's `data` came
    /// from a spliced sub-array element threaded through a `ContextBoundValue`
    /// (spec §4.E: "wrap each sub-result with a parent-object reference").
    pub cbv_container: Option<Value>,
}

impl Context {
    /// Create a root context (self-referential `root`).
    pub fn new_root(data: Value) -> Rc<Context> {
        Rc::new_cyclic(|weak| Context {
            data,
            parent: None,
            root: weak.clone(),
            bindings: RefCell::new(None),
            is_array_item: false,
            cbv_container: None,
        })
    }

    fn new_child(self: &Rc<Self>, data: Value, is_array_item: bool, cbv_container: Option<Value>) -> Rc<Context> {
        Rc::new(Context {
            data,
            parent: Some(self.clone()),
            root: self.root.clone(),
            bindings: RefCell::new(None),
            is_array_item,
            cbv_container,
        })
    }

    /// Push a non-array-item child context.
    pub fn child(self: &Rc<Self>, data: Value) -> Rc<Context> {
        self.new_child(data, false, None)
    }

    /// Push a child created by iterating an array element in a path step.
    pub fn array_item_child(self: &Rc<Self>, data: Value) -> Rc<Context> {
        self.new_child(data, true, None)
    }

    /// Push an array-item child that also carries a `%`-target override.
    pub fn array_item_child_with_container(
        self: &Rc<Self>,
        data: Value,
        container: Value,
    ) -> Rc<Context> {
        self.new_child(data, true, Some(container))
    }

    /// The outermost context of this evaluation (`$$`).
    pub fn root(&self) -> Rc<Context> {
        self.root.upgrade().expect("root context dropped while a descendant context is still alive")
    }

    pub fn root_data(&self) -> Value {
        self.root().data.clone()
    }

    /// Look up a variable binding: current context, then parents.
    pub fn get_binding(&self, name: &str) -> Option<Value> {
        if let Some(bindings) = self.bindings.borrow().as_ref() {
            if let Some(v) = bindings.get(name) {
                return Some(v.clone());
            }
        }
        self.parent.as_ref().and_then(|p| p.get_binding(name))
    }

    /// Bind a variable at this context's level (lazily allocates the map).
    pub fn set_binding(&self, name: impl Into<String>, value: Value) {
        let mut bindings = self.bindings.borrow_mut();
        bindings.get_or_insert_with(IndexMap::new).insert(name.into(), value);
    }

    /// Walk the parent chain for the nearest array-item context and return
    /// its `%`-target (the CBV container override if present, else the
    /// context's own parent's data). Returns `None` if no array-item
    /// ancestor exists — the caller raises `invalid_parent`.
    pub fn parent_target(&self) -> Option<Value> {
        let mut node: &Context = self;
        loop {
            if node.is_array_item {
                if let Some(container) = &node.cbv_container {
                    return Some(container.clone());
                }
                return node.parent.as_ref().map(|p| p.data.clone());
            }
            node = node.parent.as_deref()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_self_referential() {
        let root = Context::new_root(Value::Number(1.0));
        assert!(Rc::ptr_eq(&root.root(), &root));
    }

    #[test]
    fn test_child_keeps_root_shortcut() {
        let root = Context::new_root(Value::Number(1.0));
        let child = root.child(Value::Number(2.0));
        assert!(Rc::ptr_eq(&child.root(), &root));
        assert_eq!(child.root_data(), Value::Number(1.0));
    }

    #[test]
    fn test_binding_lookup_walks_parents() {
        let root = Context::new_root(Value::Null);
        root.set_binding("x", Value::Number(42.0));
        let child = root.child(Value::Null);
        assert_eq!(child.get_binding("x"), Some(Value::Number(42.0)));
        assert_eq!(child.get_binding("missing"), None);
    }

    #[test]
    fn test_rebinding_overwrites_value() {
        let root = Context::new_root(Value::Null);
        root.set_binding("x", Value::Number(1.0));
        root.set_binding("x", Value::Number(2.0));
        assert_eq!(root.get_binding("x"), Some(Value::Number(2.0)));
    }

    #[test]
    fn test_parent_target_requires_array_item_ancestor() {
        let root = Context::new_root(Value::Null);
        let plain_child = root.child(Value::Number(1.0));
        assert_eq!(plain_child.parent_target(), None);

        let array_child = root.array_item_child(Value::Number(1.0));
        assert_eq!(array_child.parent_target(), Some(Value::Null));
    }

    #[test]
    fn test_parent_target_prefers_cbv_container() {
        let root = Context::new_root(Value::Null);
        let container = Value::String("container".into());
        let item = root.array_item_child_with_container(Value::Number(1.0), container.clone());
        assert_eq!(item.parent_target(), Some(container));
    }
}
