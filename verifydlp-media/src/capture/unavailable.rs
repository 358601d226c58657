//! Backend for builds without device capture support

use crate::error::{MediaError, MediaResult};
use crate::frame::VideoFrame;
use crate::video_capture::{CameraBackend, CaptureConfig, VideoDevice};

/// Camera that never opens
///
/// Stands in for the device when the crate is built without the
/// `native-camera` feature, so a flow fails at camera acquisition instead of
/// streaming something that is not the user.
#[derive(Debug, Default)]
pub struct UnavailableCamera;

impl UnavailableCamera {
    pub fn new() -> Self {
        Self
    }
}

impl CameraBackend for UnavailableCamera {
    fn enumerate_devices(&self) -> MediaResult<Vec<VideoDevice>> {
        Ok(vec![])
    }

    fn open(&mut self, _config: &CaptureConfig) -> MediaResult<()> {
        Err(MediaError::DeviceNotFound {
            device_id: "default camera (built without native-camera support)".to_string(),
        })
    }

    fn close(&mut self) -> MediaResult<()> {
        Ok(())
    }

    fn is_open(&self) -> bool {
        false
    }

    fn has_frame(&self) -> bool {
        false
    }

    fn snapshot(&mut self) -> MediaResult<Option<VideoFrame>> {
        Ok(None)
    }
}
