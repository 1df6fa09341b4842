//! Error types shared by every quill crate.
//!
//! Format and conversion errors are programmer-facing and surface as
//! `AppError`. Failed model calls are not errors at this level; they travel
//! as `LlmOutcome::Failure` values so multi-step pipelines can stop cleanly.

use thiserror::Error;

/// Unified error type for quill.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed prompt document (unknown or unclosed tag, prompt cardinality)
    #[error("Format error: {0}")]
    Format(String),

    /// Text could not be converted to the requested type
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Prompt template loading or rendering errors
    #[error("Template error: {0}")]
    Template(String),

    /// LLM client construction or transport setup errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
