//! Error types for the verification client

use thiserror::Error;

/// Main error type for verification flow operations
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Camera permission was refused by the platform or the user
    #[error("Camera permission denied: {reason}")]
    CameraPermissionDenied {
        /// Reason reported by the capture backend
        reason: String,
    },

    /// Camera device missing or failed while opening
    #[error("Camera unavailable: {reason}")]
    CameraUnavailable {
        /// Reason reported by the capture backend
        reason: String,
    },

    /// Connection to the liveness service could not be opened or broke
    #[error("Connection to {url} failed: {reason}")]
    ConnectionFailed {
        /// Service address
        url: String,
        /// Reason for connection failure
        reason: String,
    },

    /// Connection closed while the service decision was still pending
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// Liveness service reported a timeout or an explicit error
    #[error("Liveness service rejected the attempt: {message}")]
    LivenessRejected {
        /// Message carried by the service
        message: String,
    },

    /// Document submission failed at the transport level
    #[error("Submission failed{}: {reason}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    SubmissionTransport {
        /// HTTP status when a response was received
        status: Option<u16>,
        /// Reason for failure
        reason: String,
    },

    /// Verification endpoint answered with `verified: false`
    #[error("Verification rejected: {message}")]
    VerificationRejected {
        /// Message carried by the endpoint
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Reason the configuration was rejected
        reason: String,
    },

    /// Invalid message format
    #[error("Invalid message format: {message}, error: {source}")]
    InvalidMessage {
        /// Invalid message content
        message: String,
        /// Parsing error
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl VerifyError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            VerifyError::CameraPermissionDenied { .. } => "CAMERA_PERMISSION_DENIED".to_string(),
            VerifyError::CameraUnavailable { .. } => "CAMERA_UNAVAILABLE".to_string(),
            VerifyError::ConnectionFailed { .. } => "CONNECTION_FAILED".to_string(),
            VerifyError::ConnectionClosed => "CONNECTION_CLOSED".to_string(),
            VerifyError::LivenessRejected { .. } => "LIVENESS_REJECTED".to_string(),
            VerifyError::SubmissionTransport { .. } => "SUBMISSION_TRANSPORT".to_string(),
            VerifyError::VerificationRejected { .. } => "VERIFICATION_REJECTED".to_string(),
            VerifyError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION".to_string(),
            VerifyError::InvalidMessage { .. } => "INVALID_MESSAGE".to_string(),
        }
    }

    /// Text shown to the user when this error ends a verification attempt
    pub fn user_message(&self) -> String {
        match self {
            VerifyError::CameraPermissionDenied { .. } | VerifyError::CameraUnavailable { .. } => {
                "Camera access is required for liveness detection".to_string()
            }
            VerifyError::ConnectionFailed { .. } => {
                "Connection to liveness service failed".to_string()
            }
            VerifyError::ConnectionClosed => "Connection to liveness service was lost".to_string(),
            VerifyError::LivenessRejected { message } => message.clone(),
            VerifyError::SubmissionTransport { .. } => "Failed to verify identity".to_string(),
            VerifyError::VerificationRejected { message } => message.clone(),
            VerifyError::InvalidConfiguration { .. } | VerifyError::InvalidMessage { .. } => {
                self.to_string()
            }
        }
    }

    /// Whether the failure came from the camera side of the flow
    pub fn is_capture_error(&self) -> bool {
        matches!(
            self,
            VerifyError::CameraPermissionDenied { .. } | VerifyError::CameraUnavailable { .. }
        )
    }
}
