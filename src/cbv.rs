//! `ContextBoundValue` (spec §3.4): the internal wrapper `#$i`/`@$x` use to
//! thread bindings and rewind-context through a path step without those
//! concepts leaking into user-visible values. Grounded on the teacher's
//! `data_wrapper::TrackedData`, which plays the analogous role of a
//! carry-extra-bookkeeping-alongside-the-value wrapper that must be unwrapped
//! before it reaches a consumer.

use indexmap::IndexMap;

use crate::value::Value;

/// A value threaded through a path step together with the bindings and
/// rewind-context `#$i`/`@$x` attach to it. Never observable outside the
/// path/filter/context-operator machinery (spec §3.4 invariant).
#[derive(Debug, Clone)]
pub struct ContextBoundValue {
    pub value: Value,
    /// `@$x`'s rewind-parent: the data the next path step should use as `$`,
    /// instead of `value` itself, to implement cross-collection joins.
    pub rewind_parent: Option<Value>,
    /// Bindings carried forward to the next step's context (`$i`, `$x`, …).
    pub bindings: IndexMap<String, Value>,
    /// `%`-target override set when this CBV was produced by splicing a
    /// sub-array with no bindings of its own (spec §4.E).
    pub container: Option<Value>,
}

impl ContextBoundValue {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            rewind_parent: None,
            bindings: IndexMap::new(),
            container: None,
        }
    }

    pub fn with_binding(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bindings.insert(name.into(), value);
        self
    }

    pub fn with_rewind_parent(mut self, data: Value) -> Self {
        self.rewind_parent = Some(data);
        self
    }

    pub fn with_container(mut self, container: Value) -> Self {
        self.container = Some(container);
        self
    }

    /// The value the next path step iterates: the rewind-parent if `@$x`
    /// set one, else the wrapped value itself.
    pub fn step_input(&self) -> &Value {
        self.rewind_parent.as_ref().unwrap_or(&self.value)
    }

    /// Wrap `new_value` so it carries forward this CBV's bindings, rewind
    /// target and container — used when a path step splices a sub-array
    /// produced from a bound element (spec §4.E "wrap each spliced
    /// sub-result so the bindings propagate").
    pub fn rewrap(&self, new_value: Value) -> ContextBoundValue {
        ContextBoundValue {
            value: new_value,
            rewind_parent: self.rewind_parent.clone(),
            bindings: self.bindings.clone(),
            container: self.container.clone(),
        }
    }

    /// Like [`Self::rewrap`], but drops `rewind_parent`: used once a step has
    /// already consumed it as `$` to produce `new_value` (spec §4.G "the
    /// *next* path step uses the rewind-parent" — singular, so it does not
    /// carry forward past the step that consumed it).
    pub fn rewrap_spent(&self, new_value: Value) -> ContextBoundValue {
        ContextBoundValue {
            value: new_value,
            rewind_parent: None,
            bindings: self.bindings.clone(),
            container: self.container.clone(),
        }
    }
}

/// Recursively strip any `ContextBoundValue` wrapping from a plain `Value`
/// tree. `Value` itself never contains a CBV variant (CBVs are a separate
/// type that only appears in the path engine's intermediate sequences), so
/// this is a no-op placeholder for the invariant check call sites use before
/// returning to user code; the real unwrap happens where path/filter code
/// collects `Either<Value, ContextBoundValue>` intermediate results back into
/// a plain `Vec<Value>`.
pub fn unwrap_value(cbv: ContextBoundValue) -> Value {
    cbv.value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_input_defaults_to_value() {
        let cbv = ContextBoundValue::new(Value::Number(1.0));
        assert_eq!(cbv.step_input(), &Value::Number(1.0));
    }

    #[test]
    fn test_step_input_prefers_rewind_parent() {
        let cbv = ContextBoundValue::new(Value::Number(1.0)).with_rewind_parent(Value::Number(2.0));
        assert_eq!(cbv.step_input(), &Value::Number(2.0));
    }

    #[test]
    fn test_rewrap_spent_drops_rewind_parent_but_keeps_bindings() {
        let cbv = ContextBoundValue::new(Value::Number(1.0))
            .with_rewind_parent(Value::Number(2.0))
            .with_binding("x", Value::Number(3.0));
        let rewrapped = cbv.rewrap_spent(Value::Number(5.0));
        assert_eq!(rewrapped.rewind_parent, None);
        assert_eq!(rewrapped.bindings.get("x"), Some(&Value::Number(3.0)));
        assert_eq!(rewrapped.step_input(), &Value::Number(5.0));
    }

    #[test]
    fn test_rewrap_preserves_bindings() {
        let cbv = ContextBoundValue::new(Value::Number(1.0)).with_binding("i", Value::Number(0.0));
        let rewrapped = cbv.rewrap(Value::Number(5.0));
        assert_eq!(rewrapped.bindings.get("i"), Some(&Value::Number(0.0)));
        assert_eq!(rewrapped.value, Value::Number(5.0));
    }
}
