use thiserror::Error;

/// Result type for qnetwork operations
pub type Result<T> = std::result::Result<T, QNetError>;

/// Main error type for the qnetwork library
#[derive(Debug, Clone, Error)]
pub enum QNetError {
    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Update rule identifier not recognised
    #[error("Unrecognized update rule: {0}")]
    UnknownUpdateRule(String),

    /// Invalid action
    #[error("Invalid action {action}: must be less than {max_actions}")]
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// Training error
    #[error("Training error: {0}")]
    TrainingError(String),

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<std::io::Error> for QNetError {
    fn from(err: std::io::Error) -> Self {
        QNetError::IoError(err.to_string())
    }
}

impl From<bincode::Error> for QNetError {
    fn from(err: bincode::Error) -> Self {
        QNetError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for QNetError {
    fn from(err: serde_json::Error) -> Self {
        QNetError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for QNetError {
    fn from(err: ndarray::ShapeError) -> Self {
        QNetError::DimensionMismatch {
            expected: "compatible array layout".to_string(),
            actual: err.to_string(),
        }
    }
}

// Helper functions for common error patterns
impl QNetError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        QNetError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        QNetError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
