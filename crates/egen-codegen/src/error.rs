use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("malformed spec at '{key}': {reason}")]
    SpecMalformed { key: String, reason: String },

    #[error("template placeholder '{placeholder}' has no handler")]
    MissingTemplateHandler { placeholder: String },

    #[error("malformed template: {0}")]
    MalformedTemplate(String),

    #[error("circular dependency: class '{dependent}' requires '{requirement}'")]
    CircularDependency {
        requirement: String,
        dependent: String,
    },

    #[error("invalid config {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodegenError {
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        CodegenError::SpecMalformed {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
