use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{default_true, is_false, is_true, ArgSpec};

/// Name of the implicit opcode sentinel (code 0).
pub const BAD_OP: &str = "BAD_OP";

/// The `opcode` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OpcodeSection {
    /// Parameter list of the generated `typed_exec` dispatch function
    pub params: String,

    /// Header providing the operator implementations referenced by `stmt`s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_path: Option<String>,

    /// Opcodes in enum order
    pub opcalls: IndexMap<String, OpSpec>,

    /// Named per-op behaviours, each with a generic body that individual
    /// opcodes may specialize
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub per_op: IndexMap<String, PerOpSpec>,
}

/// A single opcode entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OpSpec {
    /// Statement executed inside the dispatch switch
    pub stmt: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub commutative: bool,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub idempotent: bool,

    /// Per-op behaviour specializations keyed by behaviour name
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub per_op_overrides: IndexMap<String, OverrideSpec>,
}

impl OpSpec {
    pub fn new(stmt: impl Into<String>) -> Self {
        Self {
            stmt: stmt.into(),
            commutative: false,
            idempotent: true,
            per_op_overrides: IndexMap::new(),
        }
    }
}

/// A per-op specialization: either its own body or a reference to the
/// override another opcode declares for the same behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum OverrideSpec {
    Body(String),
    Alias { alias: String },
}

/// A per-op behaviour: the generic fallback and its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PerOpSpec {
    #[serde(default = "default_void")]
    pub out: String,

    #[serde(default)]
    pub args: Vec<ArgSpec>,

    /// Body used by every opcode without an override
    pub default: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_void() -> String {
    "void".to_string()
}
