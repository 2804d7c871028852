//! Typed model of the egen specification document.
//!
//! A specification is a nested key-value document with the independent
//! top-level sections `opcode`, `dtype` and `api`. Map order is preserved
//! everywhere because it becomes enum ordinal order and emission order in
//! the generated sources.

pub mod loader;
pub mod parser;
pub mod schema_def;
pub mod types;

pub use loader::{load_reader, load_specs, merge_documents, SpecError};
pub use types::document::SpecDocument;
