use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::api::ApiSpec;
use super::dtype::DTypeSpec;
use super::opcode::OpcodeSection;

/// The merged specification document. Every section is optional; a missing
/// section disables the plugin that consumes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SpecDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opcode: Option<OpcodeSection>,

    /// Dtype codes in enum order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<IndexMap<String, DTypeSpec>>,

    /// Preprocessor defines emitted at the top of the dtype header
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,

    /// Default dtype code (first declared dtype when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiSpec>,
}

impl SpecDocument {
    /// Names of the sections present in this document.
    pub fn sections(&self) -> Vec<&'static str> {
        let mut sections = Vec::new();
        if self.opcode.is_some() {
            sections.push("opcode");
        }
        if self.dtype.is_some() {
            sections.push("dtype");
        }
        if self.api.is_some() {
            sections.push("api");
        }
        sections
    }
}
