//! Camera backend replaying still images from disk
//!
//! Frames keep the native dimensions of each image; the configured capture
//! resolution is only a hint for live devices.

use crate::error::{MediaError, MediaResult};
use crate::frame::VideoFrame;
use crate::video_capture::{CameraBackend, CaptureConfig, VideoDevice};
use std::path::PathBuf;
use tracing::debug;

/// Loops over a fixed list of image files
#[derive(Debug)]
pub struct ImageSequenceCamera {
    paths: Vec<PathBuf>,
    frames: Vec<VideoFrame>,
    cursor: usize,
    open: bool,
}

impl ImageSequenceCamera {
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            frames: Vec::new(),
            cursor: 0,
            open: false,
        }
    }

    fn load(&self) -> MediaResult<Vec<VideoFrame>> {
        self.paths
            .iter()
            .map(|path| {
                if !path.exists() {
                    return Err(MediaError::DeviceNotFound {
                        device_id: path.display().to_string(),
                    });
                }
                let image = image::open(path)?.to_rgb8();
                let (width, height) = image.dimensions();
                debug!("Loaded frame {} ({}x{})", path.display(), width, height);
                Ok(VideoFrame::new(width, height, image.into_raw()))
            })
            .collect()
    }
}

impl CameraBackend for ImageSequenceCamera {
    fn enumerate_devices(&self) -> MediaResult<Vec<VideoDevice>> {
        if self.paths.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![VideoDevice {
            id: "image_sequence".to_string(),
            name: "Image Sequence".to_string(),
            description: format!("{} still image(s)", self.paths.len()),
        }])
    }

    fn open(&mut self, _config: &CaptureConfig) -> MediaResult<()> {
        if self.paths.is_empty() {
            return Err(MediaError::DeviceNotFound {
                device_id: "image_sequence".to_string(),
            });
        }
        self.frames = self.load()?;
        self.cursor = 0;
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> MediaResult<()> {
        self.frames.clear();
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn has_frame(&self) -> bool {
        self.open && !self.frames.is_empty()
    }

    fn snapshot(&mut self) -> MediaResult<Option<VideoFrame>> {
        if !self.has_frame() {
            return Ok(None);
        }
        let frame = self.frames[self.cursor % self.frames.len()].clone();
        self.cursor = self.cursor.wrapping_add(1);
        Ok(Some(frame))
    }
}
