use jsonschema::Validator;
use schemars::schema_for;

use crate::types::document::SpecDocument;
use crate::types::error::{ErrorEntry, E_SCHEMA_VIOLATION};

/// Generate a JSON Schema for `SpecDocument`.
pub fn document_schema() -> serde_json::Value {
    serde_json::to_value(schema_for!(SpecDocument)).expect("schema serialization should not fail")
}

/// Validate a raw document against the `SpecDocument` schema.
pub fn check_document(value: &serde_json::Value, file: &str) -> Vec<ErrorEntry> {
    validate_against_schema(value, &document_schema())
        .into_iter()
        .map(|mut entry| {
            entry.file = file.to_string();
            entry
        })
        .collect()
}

/// Validate a JSON value against a JSON Schema, returning errors in `ErrorEntry` format.
pub fn validate_against_schema(
    value: &serde_json::Value,
    schema: &serde_json::Value,
) -> Vec<ErrorEntry> {
    let compiled = match Validator::new(schema) {
        Ok(v) => v,
        Err(e) => {
            return vec![ErrorEntry::error(
                E_SCHEMA_VIOLATION,
                format!("Invalid schema: {e}"),
                "",
                "$",
            )];
        }
    };

    compiled
        .iter_errors(value)
        .map(|err| {
            let instance_path = err.instance_path.as_str();
            let path = if instance_path.is_empty() {
                "$".to_string()
            } else {
                format!("${}", instance_path.replace('/', "."))
            };
            ErrorEntry::error(E_SCHEMA_VIOLATION, err.to_string(), "", &path)
        })
        .collect()
}
