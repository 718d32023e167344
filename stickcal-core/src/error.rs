//! Error types for the calibration workbench

use crate::StickSide;

/// Result type alias
pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Calibration error types
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    /// The backend already runs a session
    #[error("a calibration session is already running for the {0} stick")]
    SessionInProgress(StickSide),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Calibration or config file could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Calibration service failure
    #[error("calibration service error: {0}")]
    Backend(String),

    /// Configuration value out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
