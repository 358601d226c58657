//! Synthetic camera producing a moving test pattern
//!
//! Used for demos without a device and for exercising the capture failure
//! paths: permission refusal, a missing device, and a camera that never
//! reports a renderable frame.

use crate::error::{MediaError, MediaResult};
use crate::frame::VideoFrame;
use crate::video_capture::{CameraBackend, CaptureConfig, VideoDevice, VideoResolution};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Normal,
    DenyPermission,
    NoDevice,
    Silent,
}

/// Test-pattern camera backend
#[derive(Debug)]
pub struct SyntheticCamera {
    behavior: Behavior,
    resolution: Option<VideoResolution>,
    sequence: u64,
    opens: Arc<AtomicUsize>,
}

impl SyntheticCamera {
    /// Camera that opens normally and reports frames immediately
    pub fn new() -> Self {
        Self {
            behavior: Behavior::Normal,
            resolution: None,
            sequence: 0,
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Camera whose open is refused as a permission denial
    pub fn deny_permission() -> Self {
        Self {
            behavior: Behavior::DenyPermission,
            ..Self::new()
        }
    }

    /// Camera with no device attached
    pub fn without_device() -> Self {
        Self {
            behavior: Behavior::NoDevice,
            ..Self::new()
        }
    }

    /// Camera that opens and yields snapshots but never signals readiness
    pub fn silent() -> Self {
        Self {
            behavior: Behavior::Silent,
            ..Self::new()
        }
    }

    /// Counter of successful opens, shared with clones of this handle
    pub fn open_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.opens)
    }

    fn render(&self, resolution: VideoResolution) -> VideoFrame {
        let shift = (self.sequence % 256) as u8;
        let mut data = Vec::with_capacity(resolution.pixel_count() as usize * 3);
        for y in 0..resolution.height {
            for x in 0..resolution.width {
                data.push((x as u8).wrapping_add(shift));
                data.push((y as u8).wrapping_add(shift));
                data.push(((x ^ y) as u8).wrapping_sub(shift));
            }
        }
        VideoFrame::new(resolution.width, resolution.height, data)
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for SyntheticCamera {
    fn enumerate_devices(&self) -> MediaResult<Vec<VideoDevice>> {
        if self.behavior == Behavior::NoDevice {
            return Ok(vec![]);
        }
        Ok(vec![VideoDevice {
            id: "synthetic_0".to_string(),
            name: "Synthetic Camera".to_string(),
            description: "Generated test pattern".to_string(),
        }])
    }

    fn open(&mut self, config: &CaptureConfig) -> MediaResult<()> {
        match self.behavior {
            Behavior::DenyPermission => Err(MediaError::PermissionDenied {
                operation: "open synthetic camera".to_string(),
            }),
            Behavior::NoDevice => Err(MediaError::DeviceNotFound {
                device_id: "synthetic_0".to_string(),
            }),
            Behavior::Normal | Behavior::Silent => {
                self.resolution = Some(config.resolution);
                self.sequence = 0;
                self.opens.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    fn close(&mut self) -> MediaResult<()> {
        self.resolution = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.resolution.is_some()
    }

    fn has_frame(&self) -> bool {
        self.behavior == Behavior::Normal && self.is_open()
    }

    fn snapshot(&mut self) -> MediaResult<Option<VideoFrame>> {
        let Some(resolution) = self.resolution else {
            return Ok(None);
        };
        self.sequence += 1;
        Ok(Some(self.render(resolution)))
    }
}
