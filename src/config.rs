use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::error::Result;

/// Default ceiling on nested calls before a program is stopped with a stack
/// overflow error.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Tunables for an [`Interpreter`](crate::interpreter::Interpreter).
///
/// Loadable from JSON; missing keys keep their defaults:
///
/// ```json
/// { "max_call_depth": 256 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterpreterConfig {
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl InterpreterConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading interpreter config from {:?}", path);

        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}
