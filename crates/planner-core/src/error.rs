//! Error types for planner-core

use thiserror::Error;

/// Result type alias for planner-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for portfolio analysis
#[derive(Error, Debug)]
pub enum Error {
    /// Input could not be accepted as a portfolio or preference record
    #[error("Validation error: {0}")]
    Validation(String),

    /// A specific field holds a value the engine cannot work with
    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Analysis could not produce a complete report
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),
}

impl Error {
    /// Build an [`Error::InvalidField`] from a field path and reason
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller's input rather than the engine
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidField { .. } | Self::Serialization(_)
        )
    }
}
