use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name of the implicit dtype sentinel (code 0).
pub const BAD_TYPE: &str = "BAD_TYPE";

/// A single dtype entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DTypeSpec {
    /// Native scalar type name (e.g. `double`, `int32_t`)
    pub ctype: String,

    /// Precision rank used for implicit promotion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_precision_optional() {
        let dtype: DTypeSpec = serde_json::from_value(serde_json::json!({ "ctype": "double" })).unwrap();
        assert_eq!(dtype.ctype, "double");
        assert_eq!(dtype.precision, None);

        let json = serde_json::to_value(&dtype).unwrap();
        assert!(json.get("precision").is_none());
    }
}
