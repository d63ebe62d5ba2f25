//! Error types for Chroma.

use thiserror::Error;

/// Main error type for core Chroma operations.
#[derive(Error, Debug)]
pub enum ChromaError {
    #[error("Colour params must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for core Chroma operations.
pub type Result<T> = std::result::Result<T, ChromaError>;
