//! Configuration for the evaluator (spec §6.4), grounded on the teacher's
//! `RLogicConfig` builder-with-presets pattern.

use std::rc::Rc;
use std::time::Duration;

use crate::builtins::Registry;

/// A host-supplied debug logging hook (spec §6.4 "optional debug logger").
/// The teacher has no tracing dependency; its only observability is a
/// `println!` gated behind `#[cfg(debug_assertions)]`. This trait is the
/// pluggable equivalent for library consumers.
pub trait DebugLogger {
    fn log(&self, message: &str);
}

/// Configuration options for an `Eval` call.
#[derive(Clone)]
pub struct EvalOptions {
    /// Maximum live evaluation-stack depth (spec §4.F recursion guard).
    pub max_depth: usize,
    /// Per-call wall-clock budget. `None` disables the timeout.
    pub timeout: Option<Duration>,
    /// Optional debug-logger hook.
    pub logger: Option<Rc<dyn DebugLogger>>,
    /// Optional custom built-in function registry (spec §6.2).
    pub registry: Option<Rc<Registry>>,
}

impl EvalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generous depth limit, no timeout — suitable for trusted expressions.
    pub fn permissive() -> Self {
        Self {
            max_depth: 10_000,
            timeout: None,
            logger: None,
            registry: None,
        }
    }

    /// Tight depth limit and a short timeout — suitable for untrusted
    /// expressions evaluated against a request-scoped deadline.
    pub fn sandboxed() -> Self {
        Self {
            max_depth: 500,
            timeout: Some(Duration::from_millis(500)),
            logger: None,
            registry: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: Rc<dyn DebugLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_registry(mut self, registry: Rc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_depth: 1_000,
            timeout: None,
            logger: None,
            registry: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EvalOptions::default();
        assert_eq!(config.max_depth, 1_000);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_permissive_config() {
        let config = EvalOptions::permissive();
        assert_eq!(config.max_depth, 10_000);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_sandboxed_config() {
        let config = EvalOptions::sandboxed();
        assert_eq!(config.max_depth, 500);
        assert!(config.timeout.is_some());
    }

    #[test]
    fn test_builder_pattern() {
        let config = EvalOptions::new()
            .with_max_depth(200)
            .with_timeout(Some(Duration::from_secs(1)));
        assert_eq!(config.max_depth, 200);
        assert_eq!(config.timeout, Some(Duration::from_secs(1)));
    }
}
