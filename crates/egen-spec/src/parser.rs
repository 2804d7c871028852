use std::path::Path;

use crate::types::document::SpecDocument;
use crate::types::error::{ErrorEntry, E_PARSE_ERROR, E_SCHEMA_VIOLATION};

/// Spec file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Json,
    Yaml,
}

/// Detect spec file format from file name
pub fn detect_format(file_path: &Path) -> Option<SpecFormat> {
    match file_path.extension()?.to_str()? {
        "json" => Some(SpecFormat::Json),
        "yml" | "yaml" => Some(SpecFormat::Yaml),
        _ => None,
    }
}

/// Parse one raw document. An empty document parses to an empty object.
#[allow(clippy::result_large_err)]
pub fn parse_value(
    content: &str,
    format: SpecFormat,
    file_path: &str,
) -> Result<serde_json::Value, ErrorEntry> {
    let value = match format {
        SpecFormat::Json => serde_json::from_str(content)
            .map_err(|e| json_error_to_entry(e, file_path))?,
        SpecFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| yaml_error_to_entry(e, file_path))?
        }
    };

    match value {
        serde_json::Value::Null => Ok(serde_json::Value::Object(Default::default())),
        serde_json::Value::Object(_) => Ok(value),
        other => Err(ErrorEntry::error(
            E_SCHEMA_VIOLATION,
            format!("cannot parse non-object root document: {other}"),
            file_path,
            "$",
        )
        .with_suggestion("The root of a spec must be a map with opcode, dtype or api sections")),
    }
}

/// Convert a raw (merged) document into the typed model.
#[allow(clippy::result_large_err)]
pub fn parse_document(value: serde_json::Value, file_path: &str) -> Result<SpecDocument, ErrorEntry> {
    serde_json::from_value(value).map_err(|e| {
        ErrorEntry::error(
            E_SCHEMA_VIOLATION,
            format!("malformed spec: {e}"),
            file_path,
            "$",
        )
    })
}

/// Convert a serde_json error into a structured ErrorEntry
fn json_error_to_entry(err: serde_json::Error, file_path: &str) -> ErrorEntry {
    let line = err.line();
    let col = err.column();
    let path = format!("$.line:{line}:col:{col}");

    ErrorEntry::error(
        E_PARSE_ERROR,
        format!("JSON parse error: {err}"),
        file_path,
        &path,
    )
    .with_suggestion("Check JSON syntax and field types")
}

/// Convert a serde_yaml error into a structured ErrorEntry
fn yaml_error_to_entry(err: serde_yaml::Error, file_path: &str) -> ErrorEntry {
    let path = match err.location() {
        Some(loc) => format!("$.line:{}:col:{}", loc.line(), loc.column()),
        None => "$".to_string(),
    };

    ErrorEntry::error(
        E_PARSE_ERROR,
        format!("YAML parse error: {err}"),
        file_path,
        &path,
    )
    .with_suggestion("Check YAML indentation and field types")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("ops.json")), Some(SpecFormat::Json));
        assert_eq!(detect_format(Path::new("a/api.yml")), Some(SpecFormat::Yaml));
        assert_eq!(detect_format(Path::new("a/api.yaml")), Some(SpecFormat::Yaml));
        assert_eq!(detect_format(Path::new("README.md")), None);
        assert_eq!(detect_format(Path::new("Makefile")), None);
    }

    #[test]
    fn test_parse_yaml_preserves_order() {
        let value = parse_value(
            "dtype:\n  FLOAT:\n    ctype: float\n  DOUBLE:\n    ctype: double\n",
            SpecFormat::Yaml,
            "types.yml",
        )
        .unwrap();
        let doc = parse_document(value, "types.yml").unwrap();
        let codes: Vec<&str> = doc.dtype.as_ref().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(codes, vec!["FLOAT", "DOUBLE"]);
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_value("{ invalid json }", SpecFormat::Json, "ops.json").unwrap_err();
        assert_eq!(err.code, E_PARSE_ERROR);
        assert_eq!(err.file, "ops.json");
        assert!(err.message.contains("JSON parse error"));
    }

    #[test]
    fn test_empty_yaml_is_empty_object() {
        let value = parse_value("", SpecFormat::Yaml, "-").unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn test_non_object_root_rejected() {
        let err = parse_value("[1, 2]", SpecFormat::Json, "list.json").unwrap_err();
        assert_eq!(err.code, E_SCHEMA_VIOLATION);
    }

    #[test]
    fn test_wrong_section_type() {
        let err = parse_document(serde_json::json!({ "dtype": [1, 2] }), "bad.json").unwrap_err();
        assert_eq!(err.code, E_SCHEMA_VIOLATION);
        assert!(err.message.contains("malformed spec"));
    }
}
