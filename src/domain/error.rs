use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    ValidationError(String),
    ParseError(String),
    LLMError(String),
    SecurityError(String),
    DatabaseError(String),
    IoError(String),
    ExportError(String),
    /// The generation service failed, answered non-2xx, or answered nothing.
    GenerationUnavailable(String),
    /// The generation output was not JSON, or not a JSON array.
    MalformedGenerationOutput { reason: String, raw: String },
    /// A generated element did not match the test case schema.
    TestCaseValidation {
        index: usize,
        field: String,
        reason: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::LLMError(msg) => write!(f, "LLM error: {}", msg),
            AppError::SecurityError(msg) => write!(f, "Security error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::ExportError(msg) => write!(f, "Export error: {}", msg),
            AppError::GenerationUnavailable(msg) => {
                write!(f, "Generation service unavailable: {}", msg)
            }
            AppError::MalformedGenerationOutput { reason, .. } => {
                write!(f, "Model response was not a valid JSON array: {}", reason)
            }
            AppError::TestCaseValidation {
                index,
                field,
                reason,
            } => write!(
                f,
                "Test case validation error at index {} ({}): {}",
                index, field, reason
            ),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
