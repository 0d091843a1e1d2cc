/// Error types for the model tree
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    /// Attribute path is not of the form `object_type.instance.attribute`
    #[error("Invalid attribute path: {0}")]
    InvalidPath(String),

    /// Curve has mismatched, empty or unsorted axes
    #[error("Invalid curve: {0}")]
    InvalidCurve(String),

    /// Failed to read or write a JSON document
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
