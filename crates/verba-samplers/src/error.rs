//! Error types for the sampling module.

use std::fmt::Display;

use thiserror::Error;

/// Result type for sampling operations.
pub type SamplerResult<T> = Result<T, SamplerError>;

/// Boxed error produced by a caller-supplied next-token function.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for sampling operations.
#[derive(Error, Debug)]
pub enum SamplerError {
    /// Invalid construction parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid call argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Shape mismatch between prompt, cache, logits or hidden states
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape
        expected: String,
        /// Actual shape
        actual: String,
    },

    /// Failure raised inside the next-token function
    #[error("Next-token function failed: {0}")]
    NextToken(#[source] BoxedError),
}

impl SamplerError {
    /// Wraps an arbitrary error raised by a next-token function.
    pub fn next_token<E: Into<BoxedError>>(err: E) -> Self {
        Self::NextToken(err.into())
    }

    pub(crate) fn shape_mismatch(expected: impl Display, actual: impl Display) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
