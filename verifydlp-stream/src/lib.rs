//! # Verify-dlp Streaming
//!
//! Client side of the liveness service's streaming protocol: the JSON wire
//! messages, the two-stage conversation decoder, and the WebSocket client
//! that paces frame transmission.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod protocol;
pub mod session;

// Re-export main types
pub use client::{FramePayloadSource, StreamConfig, StreamEvents, StreamingClient};
pub use error::StreamError;
pub use protocol::{ClientMessage, LivenessStatus, StatusMessage};
pub use session::{LivenessProtocol, ProtocolStage, StreamEvent};
