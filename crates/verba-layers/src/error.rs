//! Error types for the preprocessing layers.

use thiserror::Error;

/// Result type for layer operations.
pub type LayerResult<T> = Result<T, LayerError>;

/// Error types for layer operations.
#[derive(Error, Debug)]
pub enum LayerError {
    /// Invalid construction parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid call argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Array construction failed
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}
