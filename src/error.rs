//! Error types for the earlywarn crate

use thiserror::Error;

/// Result type alias for earlywarn operations
pub type Result<T> = std::result::Result<T, EarlywarnError>;

/// Main error type for the earlywarn crate
#[derive(Error, Debug)]
pub enum EarlywarnError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EarlywarnError::Model("empty tree list".to_string());
        assert_eq!(err.to_string(), "Model error: empty tree list");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EarlywarnError = io_err.into();
        assert!(matches!(err, EarlywarnError::Io(_)));
    }

    #[test]
    fn test_shape_error_display() {
        let err = EarlywarnError::Shape {
            expected: "40 features".to_string(),
            actual: "3 features".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid shape: expected 40 features, got 3 features"
        );
    }
}
