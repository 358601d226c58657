//! # Verify-dlp - Identity Verification Client
//!
//! Verify-dlp drives a two-step identity check against a remote service:
//! camera frames are streamed over a WebSocket for liveness detection, then
//! an ID document is uploaded together with the liveness session id and the
//! verification result is reported back.
//!
//! All inference happens remotely. This crate owns the camera, the liveness
//! connection and its frame timer, and the phase the user sees.
//!
//! The default build opens the platform camera through the `native-camera`
//! feature, preferring the user-facing device. Without it, no camera is
//! available unless one is passed to [`FlowBuilder::camera`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use verifydlp::{IdentityDocument, UserIntent, VerificationFlow, VerificationPhase};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut flow = VerificationFlow::builder().build()?;
//!
//!     // Camera, then liveness until the service decides
//!     flow.dispatch(UserIntent::Start).await;
//!     if flow.drive_liveness().await == VerificationPhase::Upload {
//!         let card = IdentityDocument::from_path("id_card.jpg").await?;
//!         flow.dispatch(UserIntent::ChooseDocument(card)).await;
//!         flow.dispatch(UserIntent::Submit).await;
//!     }
//!
//!     println!("Finished in {:?}", flow.phase());
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use verifydlp_core::{ServiceConfig, VerifyError, DEFAULT_SERVICE_URL, SERVICE_URL_ENV};
pub use verifydlp_media::{
    CameraBackend, CaptureConfig, EncoderConfig, FacingMode, FrameEncoder, ImageSequenceCamera,
    MediaCapture, MediaError, SyntheticCamera, UnavailableCamera, VideoFrame, VideoResolution,
};
#[cfg(feature = "native-camera")]
pub use verifydlp_media::NativeCamera;
pub use verifydlp_stream::{
    LivenessProtocol, ProtocolStage, StreamConfig, StreamError, StreamEvent, StreamingClient,
};

// Public API modules
pub mod config;
pub mod flow;
pub mod logging;
pub mod phase;
pub mod presentation;
pub mod submitter;

// Re-export main API types
pub use config::{LoggingConfig, VerifyConfig};
pub use flow::{FlowBuilder, FlowEvent, FlowView, VerificationFlow};
pub use logging::init_logging;
pub use phase::{LivenessProgress, VerificationPhase};
pub use presentation::{ConsoleRenderer, Presenter, UserIntent};
pub use submitter::{
    DocumentSubmitter, HttpVerificationTransport, IdentityDocument, Messages, Performance,
    Submission, VerificationOutcome, VerificationTransport,
};
