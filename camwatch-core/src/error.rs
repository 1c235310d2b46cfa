//! Error types for camwatch

use std::time::Duration;
use thiserror::Error;

/// Main error type for camwatch operations
#[derive(Error, Debug)]
pub enum CamWatchError {
    /// Initialization error
    #[error("Initialization failed: {reason}")]
    Initialization {
        /// Reason for initialization failure
        reason: String,
    },

    /// Missing configuration error
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },

    /// Configuration value out of range
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration {
        /// Offending configuration field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Invalid state error
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// Camera permission was refused
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// Operation that was denied
        operation: String,
    },

    /// Camera could not be opened or stopped delivering frames
    #[error("Video device error: {reason}")]
    Device {
        /// Reason for the device failure
        reason: String,
    },

    /// Media processing error
    #[error("Media processing error: {reason}")]
    MediaProcessing {
        /// Reason for media error
        reason: String,
    },

    /// Signaling or peer transport error
    #[error("Signaling error: {reason}")]
    Signaling {
        /// Reason for signaling error
        reason: String,
    },

    /// Image analysis service error
    #[error("Analysis failed: {reason}")]
    Analysis {
        /// Reason for analysis failure
        reason: String,
    },

    /// Operation timed out error
    #[error("Operation timed out: {operation} after {duration:?}")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Duration after which timeout occurred
        duration: Duration,
    },

    /// Malformed URL or query string
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl {
        /// URL that failed to parse
        url: String,
        /// Parser error
        reason: String,
    },
}

impl CamWatchError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CamWatchError::Initialization { .. } => "INITIALIZATION_FAILED",
            CamWatchError::MissingConfiguration { .. } => "MISSING_CONFIGURATION",
            CamWatchError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            CamWatchError::InvalidState { .. } => "INVALID_STATE",
            CamWatchError::PermissionDenied { .. } => "PERMISSION_DENIED",
            CamWatchError::Device { .. } => "DEVICE_ERROR",
            CamWatchError::MediaProcessing { .. } => "MEDIA_PROCESSING_ERROR",
            CamWatchError::Signaling { .. } => "SIGNALING_ERROR",
            CamWatchError::Analysis { .. } => "ANALYSIS_FAILED",
            CamWatchError::Timeout { .. } => "TIMEOUT",
            CamWatchError::InvalidUrl { .. } => "INVALID_URL",
        }
    }

    /// Whether the error came from acquiring the camera
    pub fn is_capture_error(&self) -> bool {
        matches!(
            self,
            CamWatchError::PermissionDenied { .. } | CamWatchError::Device { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = CamWatchError::PermissionDenied {
            operation: "camera access".to_string(),
        };
        assert_eq!(err.error_code(), "PERMISSION_DENIED");
        assert!(err.is_capture_error());

        let err = CamWatchError::Signaling {
            reason: "peer server unreachable".to_string(),
        };
        assert_eq!(err.error_code(), "SIGNALING_ERROR");
        assert!(!err.is_capture_error());
    }

    #[test]
    fn test_error_display() {
        let err = CamWatchError::InvalidState {
            expected: "Stopped".to_string(),
            actual: "Monitoring".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state: expected Stopped, got Monitoring"
        );
    }
}
