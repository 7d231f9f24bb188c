//! Evaluator limits.

use serde::{Deserialize, Serialize};

/// Limits applied by the [`Evaluator`](crate::Evaluator).
///
/// Deserializes from JSON with every field optional:
///
/// ```
/// let config = tern_eval::EvalConfig::from_json(r#"{"gas_limit": 10000}"#).unwrap();
/// assert_eq!(config.gas_limit, Some(10_000));
/// assert_eq!(config.max_call_depth, 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Maximum number of evaluation steps (one per statement or
    /// expression). `None` means unbounded.
    pub gas_limit: Option<u64>,
    /// Maximum nesting of script function calls.
    pub max_call_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            gas_limit: None,
            max_call_depth: 128,
        }
    }
}

impl EvalConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }
}
