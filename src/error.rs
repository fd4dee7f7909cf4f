//! Error types for the cube schema store

use std::path::PathBuf;
use thiserror::Error;

/// Result type for schema document operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema document errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Malformed schema document {}: {reason}", path.display())]
    MalformedDocument { path: PathBuf, reason: String },

    #[error(
        "Cube '{name}' not found. Available cubes: {}{}",
        available.join(", "),
        suggestion.as_ref().map(|s| format!(". Did you mean '{}'?", s)).unwrap_or_default()
    )]
    RecordNotFound {
        name: String,
        available: Vec<String>,
        suggestion: Option<String>,
    },

    #[error("Invalid cube definition at {field_path}: {reason}")]
    ValidationError { field_path: String, reason: String },

    #[error("Cube '{name}' already exists")]
    DuplicateName { name: String },

    #[error("Error writing schema file {}: {cause}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("Schema file {} changed on disk since it was loaded", path.display())]
    ConcurrentModification { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SchemaError::MalformedDocument {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid(field_path: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::ValidationError {
            field_path: field_path.into(),
            reason: reason.into(),
        }
    }
}
