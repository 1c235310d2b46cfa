//! Media error types and handling
//!
//! Errors raised while acquiring a video source, sampling frames and encoding
//! stills. Acquisition errors are surfaced to the user; frame errors only ever
//! cost a single detection tick.

use camwatch_core::CamWatchError;
use thiserror::Error;

/// Main error type for media operations
#[derive(Error, Debug)]
pub enum MediaError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// User or platform refused camera access
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// Operation that was denied
        operation: String,
    },

    /// Device not found error
    #[error("Device not found: {device_id}")]
    DeviceNotFound {
        /// Device identifier
        device_id: String,
    },

    /// Device failed while opening or streaming
    #[error("Device error: {reason}")]
    Device {
        /// Failure reason
        reason: String,
    },

    /// Capture not active error
    #[error("Capture not active")]
    CaptureNotActive,

    /// Unsupported format error
    #[error("Unsupported format: {format}")]
    UnsupportedFormat {
        /// Format description
        format: String,
    },

    /// Invalid frame data error
    #[error("Invalid frame data: expected {expected} bytes, got {actual}")]
    InvalidFrameData {
        /// Expected data size
        expected: usize,
        /// Actual data size
        actual: usize,
    },

    /// Encoding operation failed
    #[error("Encoding failed: {codec} - {reason}")]
    EncodingFailed {
        /// Codec name
        codec: String,
        /// Failure reason
        reason: String,
    },
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            MediaError::Io { .. } => true,
            MediaError::InvalidFrameData { .. } => true,
            MediaError::EncodingFailed { .. } => true,
            MediaError::Device { .. } => true,
            MediaError::PermissionDenied { .. } => false,
            MediaError::DeviceNotFound { .. } => false,
            _ => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::Io { .. } => ErrorCategory::System,
            MediaError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
            MediaError::PermissionDenied { .. } => ErrorCategory::Permission,
            MediaError::DeviceNotFound { .. } => ErrorCategory::Device,
            MediaError::Device { .. } => ErrorCategory::Device,
            MediaError::CaptureNotActive => ErrorCategory::State,
            MediaError::UnsupportedFormat { .. } => ErrorCategory::Format,
            MediaError::InvalidFrameData { .. } => ErrorCategory::Data,
            MediaError::EncodingFailed { .. } => ErrorCategory::Codec,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// System-level errors (I/O)
    System,
    /// Configuration and parameter errors
    Configuration,
    /// Camera access refused
    Permission,
    /// Device and hardware errors
    Device,
    /// State management errors
    State,
    /// Format and data structure errors
    Format,
    /// Data validation errors
    Data,
    /// Codec-related errors
    Codec,
}

impl From<MediaError> for CamWatchError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::PermissionDenied { operation } => {
                CamWatchError::PermissionDenied { operation }
            }
            MediaError::DeviceNotFound { device_id } => CamWatchError::Device {
                reason: format!("device not found: {}", device_id),
            },
            MediaError::Device { reason } => CamWatchError::Device { reason },
            MediaError::InvalidConfiguration { message } => CamWatchError::InvalidConfiguration {
                field: "video".to_string(),
                reason: message,
            },
            other => CamWatchError::MediaProcessing {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let denied = MediaError::PermissionDenied {
            operation: "camera".to_string(),
        };
        assert_eq!(denied.category(), ErrorCategory::Permission);
        assert!(!denied.is_recoverable());

        let frame = MediaError::InvalidFrameData {
            expected: 1024,
            actual: 512,
        };
        assert_eq!(frame.category(), ErrorCategory::Data);
        assert!(frame.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let error = MediaError::InvalidFrameData {
            expected: 1024,
            actual: 512,
        };
        assert_eq!(
            error.to_string(),
            "Invalid frame data: expected 1024 bytes, got 512"
        );
    }

    #[test]
    fn test_conversion_keeps_capture_errors_distinct() {
        let err: CamWatchError = MediaError::PermissionDenied {
            operation: "camera".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "PERMISSION_DENIED");

        let err: CamWatchError = MediaError::DeviceNotFound {
            device_id: "cam0".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "DEVICE_ERROR");

        let err: CamWatchError = MediaError::CaptureNotActive.into();
        assert_eq!(err.error_code(), "MEDIA_PROCESSING_ERROR");
    }
}
