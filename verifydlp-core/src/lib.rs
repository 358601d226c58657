//! # Verify-dlp Core
//!
//! Shared building blocks for the Verify-dlp identity verification client:
//! the flow-level error taxonomy and the addresses of the remote liveness and
//! verification service.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;

// Re-export main types
pub use config::{ServiceConfig, DEFAULT_SERVICE_URL, SERVICE_URL_ENV};
pub use error::VerifyError;
