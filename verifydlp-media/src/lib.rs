//! # Verify-dlp Media
//!
//! Camera capture and frame encoding for the Verify-dlp client. This crate
//! owns the camera stream, decides when it is ready to be sampled, and turns
//! snapshots into compact JPEG payloads for the liveness service.

#![warn(clippy::all)]

pub mod capture;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod video_capture;

// Re-export main types
pub use capture::{default_backend, ImageSequenceCamera, SyntheticCamera, UnavailableCamera};
#[cfg(feature = "native-camera")]
pub use capture::NativeCamera;
pub use encoder::{EncoderConfig, FrameEncoder};
pub use error::{ErrorCategory, MediaError, MediaResult};
pub use frame::VideoFrame;
pub use video_capture::{
    CameraBackend, CaptureConfig, FacingMode, FrameTap, MediaCapture, VideoDevice,
    VideoResolution,
};
