//! Error types for the training pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, TrainError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrainError::Data("bad row".to_string());
        assert_eq!(err.to_string(), "Data error: bad row");
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = TrainError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: "1.5".to_string(),
            reason: "must be in (0, 1)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameter: test_fraction = 1.5, must be in (0, 1)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory");
        let err: TrainError = io_err.into();
        assert!(matches!(err, TrainError::Io(_)));
    }
}
