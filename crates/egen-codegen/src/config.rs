use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CodegenError;

/// Generator settings that are not part of the specification document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenConfig {
    /// Namespace of the generated opcode and dtype tables
    pub namespace: String,
    /// Expression called with a message on unrecoverable errors
    pub fatal_fn: String,
    /// printf-style variant of `fatal_fn`
    pub fatalf_fn: String,
    /// Alias substituted for template parameters in the binding module
    pub binding_alias: String,
    /// Prefix of generated header guards
    pub guard_prefix: String,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            namespace: "egen".to_string(),
            fatal_fn: "global::fatal".to_string(),
            fatalf_fn: "global::fatalf".to_string(),
            binding_alias: "PybindT".to_string(),
            guard_prefix: "_GENERATED".to_string(),
        }
    }
}

impl GenConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, CodegenError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| CodegenError::Config {
            path: path.to_string_lossy().into_owned(),
            reason: e.to_string(),
        })
    }

    /// Header guard macro for `file`, e.g. `_GENERATED_OPCODE_HPP`.
    pub fn guard(&self, file: &str) -> String {
        let stem: String = file
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}_{}", self.guard_prefix, stem)
    }
}
