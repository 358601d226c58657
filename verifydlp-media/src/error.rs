//! Media error types and handling
//!
//! This module defines the error types used by camera capture and frame
//! encoding, with a coarse classification used when deciding how a failure
//! is surfaced to the user.

use thiserror::Error;
use verifydlp_core::VerifyError;

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

    /// Permission error
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// Operation that was denied
        operation: String,
    },

    /// Device enumeration failed
    #[error("Device enumeration failed: {reason}")]
    DeviceEnumerationFailed {
        /// Failure reason
        reason: String,
    },

    /// Device not found error
    #[error("Device not found: {device_id}")]
    DeviceNotFound {
        /// Device identifier
        device_id: String,
    },

    /// Device opened but failed to deliver a stream
    #[error("Device failure: {reason}")]
    DeviceFailure {
        /// Failure reason
        reason: String,
    },

    /// Encoding operation failed
    #[error("Encoding failed: {codec} - {reason}")]
    EncodingFailed {
        /// Codec name
        codec: String,
        /// Failure reason
        reason: String,
    },

    /// Decoding operation failed
    #[error("Decoding failed: {reason}")]
    DecodingFailed {
        /// Failure reason
        reason: String,
    },

    /// Invalid frame data error
    #[error("Invalid frame data: expected {expected} bytes, got {actual}")]
    InvalidFrameData {
        /// Expected data size
        expected: usize,
        /// Actual data size
        actual: usize,
    },
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::Io { .. } => ErrorCategory::System,
            MediaError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
            MediaError::PermissionDenied { .. } => ErrorCategory::Permission,
            MediaError::DeviceEnumerationFailed { .. } => ErrorCategory::Device,
            MediaError::DeviceNotFound { .. } => ErrorCategory::Device,
            MediaError::DeviceFailure { .. } => ErrorCategory::Device,
            MediaError::EncodingFailed { .. } => ErrorCategory::Codec,
            MediaError::DecodingFailed { .. } => ErrorCategory::Codec,
            MediaError::InvalidFrameData { .. } => ErrorCategory::Data,
        }
    }

    /// Whether the camera could not be acquired at all
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Permission | ErrorCategory::Device
        )
    }
}

impl From<image::ImageError> for MediaError {
    fn from(error: image::ImageError) -> Self {
        match error {
            image::ImageError::IoError(source) => MediaError::Io { source },
            image::ImageError::Encoding(e) => MediaError::EncodingFailed {
                codec: "JPEG".to_string(),
                reason: e.to_string(),
            },
            other => MediaError::DecodingFailed {
                reason: other.to_string(),
            },
        }
    }
}

impl From<MediaError> for VerifyError {
    fn from(error: MediaError) -> Self {
        match error {
            MediaError::PermissionDenied { operation } => {
                VerifyError::CameraPermissionDenied { reason: operation }
            }
            MediaError::InvalidConfiguration { message } => {
                VerifyError::InvalidConfiguration { reason: message }
            }
            other => VerifyError::CameraUnavailable {
                reason: other.to_string(),
            },
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
    /// Camera permission refused
    Permission,
    /// Device and hardware errors
    Device,
    /// Codec-related errors
    Codec,
    /// Data validation errors
    Data,
}
