//! Streaming client errors

use std::time::Duration;
use thiserror::Error;
use verifydlp_core::VerifyError;

/// Errors raised by the streaming client
#[derive(Error, Debug)]
pub enum StreamError {
    /// The WebSocket handshake failed
    #[error("WebSocket connection to {url} failed: {reason}")]
    Connect {
        /// Service address
        url: String,
        /// Failure description
        reason: String,
    },

    /// The WebSocket handshake did not finish in time
    #[error("WebSocket connection to {url} timed out after {duration:?}")]
    ConnectTimeout {
        /// Service address
        url: String,
        /// Configured limit
        duration: Duration,
    },

    /// Operation needs an open connection
    #[error("Not connected")]
    NotConnected,

    /// Connection exists but is not ready to carry frames
    #[error("Connection not ready")]
    NotReady,

    /// An outbound message could not be queued
    #[error("Failed to send message: {reason}")]
    Send {
        /// Failure description
        reason: String,
    },

    /// An outbound message could not be serialized
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<StreamError> for VerifyError {
    fn from(error: StreamError) -> Self {
        match error {
            StreamError::Connect { url, reason } => VerifyError::ConnectionFailed { url, reason },
            StreamError::ConnectTimeout { url, duration } => VerifyError::ConnectionFailed {
                url,
                reason: format!("timed out after {:?}", duration),
            },
            StreamError::NotConnected | StreamError::NotReady => VerifyError::ConnectionClosed,
            StreamError::Send { reason } => VerifyError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            StreamError::Serialize(e) => VerifyError::InvalidMessage {
                message: "outbound liveness message".to_string(),
                source: Box::new(e),
            },
        }
    }
}
