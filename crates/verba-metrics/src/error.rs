//! Error types for the metrics module.

use thiserror::Error;

/// Result type for metric operations.
pub type MetricResult<T> = Result<T, MetricError>;

/// Error types for metric operations.
#[derive(Error, Debug)]
pub enum MetricError {
    /// Invalid construction parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid update arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tokenizer pattern failed to compile
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}
