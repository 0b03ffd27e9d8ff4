//! Error types for the kvrecon-core library.

use thiserror::Error;

/// Main error type for the kvrecon library.
#[derive(Error, Debug)]
pub enum ReconError {
    /// Date format detection or template error.
    #[error("date format error: {0}")]
    Format(#[from] FormatError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to date format templates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// No text layout, structural pattern or inferred candidate matched.
    #[error("unable to detect date format for '{input}'")]
    Undetected { input: String },

    /// A candidate template did not re-parse the input it was built for.
    #[error("template '{template}' does not parse '{input}'")]
    ValidationFailed { input: String, template: String },

    /// The template string uses an unknown placeholder.
    #[error("invalid template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },
}

/// Result type for the kvrecon library.
pub type Result<T> = std::result::Result<T, ReconError>;
