//! Process-wide compiled-regex pool (spec §5 "compiled regexes... are pooled
//! process-wide behind a concurrent map"). Grounded on the teacher's
//! `dashmap`/`once_cell::Lazy` combination (`rlogic/compiled_logic_store.rs`),
//! which caches compiled logic behind the same pair of crates.

use std::rc::Rc;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

static POOL: Lazy<DashMap<String, Arc<regex::Regex>>> = Lazy::new(DashMap::new);

/// Compile `pattern` (already carrying inline flags, if any) or fetch an
/// already-compiled instance from the process-wide pool. Evaluation is
/// single-threaded per call, so callers convert the pooled `Arc` into a
/// thread-confined `Rc` for storage inside a `Value::Regex`.
pub fn compile(pattern: &str) -> Result<Rc<regex::Regex>, regex::Error> {
    if let Some(existing) = POOL.get(pattern) {
        return Ok(Rc::new((**existing).clone()));
    }
    let compiled = Arc::new(regex::Regex::new(pattern)?);
    POOL.insert(pattern.to_string(), compiled.clone());
    Ok(Rc::new((*compiled).clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_and_reuse() {
        let a = compile(r"^\d+$").unwrap();
        let b = compile(r"^\d+$").unwrap();
        assert_eq!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_invalid_pattern_errors() {
        assert!(compile(r"(unclosed").is_err());
    }
}
