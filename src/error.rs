//! Error taxonomy (spec §7): every error carries a stable symbolic code and a
//! source position. Grounded on `jsoneval/cancellation.rs`'s `CancellationError`
//! — a small `Display` + `std::error::Error` enum — generalized to the full
//! taxonomy the evaluator raises.

use std::fmt;

/// An evaluator error: a stable code, a human message, and the AST position
/// (byte offset in the original expression) it was raised at, if known.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub code: &'static str,
    pub message: String,
    pub position: usize,
}

impl EvalError {
    pub fn new(code: &'static str, message: impl Into<String>, position: usize) -> Self {
        Self {
            code,
            message: message.into(),
            position,
        }
    }

    // ---- Type mismatch ----
    pub fn non_numeric_operand(position: usize) -> Self {
        Self::new("T0010", "the operands of this operation must be numeric", position)
    }

    pub fn comparison_type_mismatch(position: usize) -> Self {
        Self::new(
            "T0011",
            "the operands to a comparison operator must be of the same type and either numbers or strings",
            position,
        )
    }

    pub fn object_key_not_string(position: usize) -> Self {
        Self::new("T1003", "key in object constructor must evaluate to a string", position)
    }

    pub fn sort_key_type(position: usize) -> Self {
        Self::new("T2003", "the single value or first value of a sort expression must be a number or a string", position)
    }

    pub fn sort_key_mixed_types(position: usize) -> Self {
        Self::new("T2004", "the values to sort must be all numbers or all strings", position)
    }

    pub fn update_not_object(position: usize) -> Self {
        Self::new("T2011", "the insert/update clause of a transform expression must evaluate to an object", position)
    }

    pub fn delete_not_string_or_array(position: usize) -> Self {
        Self::new(
            "T2012",
            "the delete clause of a transform expression must evaluate to a string or array of strings",
            position,
        )
    }

    // ---- Numeric range ----
    pub fn numeric_range(position: usize) -> Self {
        Self::new("D1001", "number out of range: result is NaN or infinite", position)
    }

    pub fn range_too_large(position: usize) -> Self {
        Self::new("D2014", "the size of the sequence allocated by the range operator exceeds the maximum of 10000000", position)
    }

    pub fn non_integer_range_bound(position: usize) -> Self {
        Self::new("T2009", "the left side of the range operator must evaluate to an integer", position)
    }

    // ---- Arity ----
    pub fn arity(name: &str, position: usize) -> Self {
        Self::new("T0410", format!("argument count is not valid for function '{name}'"), position)
    }

    // ---- Structural ----
    pub fn duplicate_key(key: &str, position: usize) -> Self {
        Self::new("D1009", format!("multiple key definitions evaluate to same key: '{key}'"), position)
    }

    pub fn zero_length_match(position: usize) -> Self {
        Self::new("D1004", "regular expression matches zero length string", position)
    }

    pub fn replacement_not_string(position: usize) -> Self {
        Self::new("D3012", "attempted to replace a matched string with a non-string value", position)
    }

    pub fn invalid_signature(message: impl Into<String>, position: usize) -> Self {
        Self::new("S0401", message, position)
    }

    pub fn invalid_parent(position: usize) -> Self {
        Self::new("D1002", "the parent operator (%) cannot be used outside of an array-iterating path step", position)
    }

    // ---- Resource ----
    pub fn depth_exceeded(position: usize) -> Self {
        Self::new("U1001", "stack overflow error: evaluator recursion depth exceeded", position)
    }

    pub fn cancelled(position: usize) -> Self {
        Self::new("U1002", "evaluation was cancelled", position)
    }

    pub fn timed_out(position: usize) -> Self {
        Self::new("U1003", "evaluation timed out", position)
    }

    // ---- Program ----
    pub fn unknown_function(name: &str, position: usize) -> Self {
        Self::new("T1006", format!("attempted to invoke a non-function: '{name}'"), position)
    }

    pub fn partial_non_function(position: usize) -> Self {
        Self::new(
            "T1007",
            "partial function application can only be applied to a direct function call or a known variable binding",
            position,
        )
    }

}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ position {}: {}", self.code, self.position, self.message)
    }
}

impl std::error::Error for EvalError {}

pub type EvalResult<T> = Result<T, EvalError>;
