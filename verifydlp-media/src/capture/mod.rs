//! Camera backends
//!
//! `NativeCamera` (feature `native-camera`, on by default) opens a real
//! device. `SyntheticCamera` and `ImageSequenceCamera` are always available
//! but only used when passed in explicitly.

pub mod image_sequence;
#[cfg(feature = "native-camera")]
pub mod native;
pub mod synthetic;
pub mod unavailable;

pub use image_sequence::ImageSequenceCamera;
#[cfg(feature = "native-camera")]
pub use native::NativeCamera;
pub use synthetic::SyntheticCamera;
pub use unavailable::UnavailableCamera;

use crate::video_capture::CameraBackend;

/// Get the default camera backend for this build
///
/// Without `native-camera` there is no device to open and the backend fails
/// at `open`.
pub fn default_backend() -> Box<dyn CameraBackend> {
    #[cfg(feature = "native-camera")]
    {
        Box::new(NativeCamera::preferred())
    }
    #[cfg(not(feature = "native-camera"))]
    {
        Box::new(UnavailableCamera::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend_starts_closed_without_frames() {
        let mut backend = default_backend();
        assert!(!backend.is_open());
        assert!(!backend.has_frame());
        assert!(backend.snapshot().unwrap().is_none());
    }

    #[cfg(not(feature = "native-camera"))]
    #[test]
    fn test_default_backend_refuses_to_open_without_device_support() {
        let mut backend = default_backend();
        let err = backend
            .open(&crate::video_capture::CaptureConfig::default())
            .unwrap_err();
        assert!(err.is_acquisition_failure());
    }
}
