use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::parser::{self, SpecFormat};
use crate::schema_def;
use crate::types::document::SpecDocument;
use crate::types::error::ErrorEntry;

/// Name used for documents read from standard input.
pub const STDIN_NAME: &str = "<stdin>";

/// Loading errors
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("spec path not found: {0}")]
    NotFound(String),

    #[error("no spec documents (*.json, *.yml, *.yaml) found under {0}")]
    NoDocuments(String),

    #[error("I/O error reading {0}: {1}")]
    Io(String, std::io::Error),

    #[error("{}: {}", .0.file, .0.message)]
    Parse(ErrorEntry),

    #[error("spec does not match the document schema: {}", summarize(.0))]
    Schema(Vec<ErrorEntry>),
}

fn summarize(entries: &[ErrorEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{} ({})", e.message, e.path))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Expand the given paths into spec files. Directories are walked for
/// spec documents, sorted by path so merge order is deterministic; plain
/// files are taken as given, in argument order.
pub fn collect_spec_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, SpecError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| parser::detect_format(p).is_some())
                .collect();
            if found.is_empty() {
                return Err(SpecError::NoDocuments(path.to_string_lossy().into_owned()));
            }
            found.sort();
            files.append(&mut found);
        } else {
            return Err(SpecError::NotFound(path.to_string_lossy().into_owned()));
        }
    }
    Ok(files)
}

/// Load, merge and type one or more spec documents.
pub fn load_specs(paths: &[PathBuf]) -> Result<SpecDocument, SpecError> {
    let files = collect_spec_files(paths)?;
    let mut values = Vec::with_capacity(files.len());
    for file in &files {
        values.push(read_value(file)?);
    }
    let source = files
        .iter()
        .map(|f| f.to_string_lossy())
        .collect::<Vec<_>>()
        .join(", ");
    build_document(merge_documents(values), &source)
}

/// Load a single document from a reader (standard input). JSON is accepted
/// as a subset of YAML.
pub fn load_reader(mut reader: impl Read) -> Result<SpecDocument, SpecError> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| SpecError::Io(STDIN_NAME.to_string(), e))?;
    let value =
        parser::parse_value(&content, SpecFormat::Yaml, STDIN_NAME).map_err(SpecError::Parse)?;
    build_document(value, STDIN_NAME)
}

fn read_value(path: &Path) -> Result<serde_json::Value, SpecError> {
    let name = path.to_string_lossy().into_owned();
    let content = std::fs::read_to_string(path).map_err(|e| SpecError::Io(name.clone(), e))?;
    let format = parser::detect_format(path).unwrap_or(SpecFormat::Yaml);
    parser::parse_value(&content, format, &name).map_err(SpecError::Parse)
}

/// Check a merged raw document against the schema, then convert it into
/// the typed model.
pub fn build_document(value: serde_json::Value, source: &str) -> Result<SpecDocument, SpecError> {
    let violations = schema_def::check_document(&value, source);
    if !violations.is_empty() {
        return Err(SpecError::Schema(violations));
    }
    parser::parse_document(value, source).map_err(SpecError::Parse)
}

/// Deep-merge documents in order. Maps merge key by key (new keys keep
/// their insertion order after existing ones); any other value is
/// replaced by the later document's.
pub fn merge_documents(documents: Vec<serde_json::Value>) -> serde_json::Value {
    let mut merged = serde_json::Value::Object(Default::default());
    for doc in documents {
        merge_into(&mut merged, doc);
    }
    merged
}

fn merge_into(base: &mut serde_json::Value, other: serde_json::Value) {
    match (base, other) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(other_map)) => {
            for (key, value) in other_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, other) => *base = other,
    }
}
