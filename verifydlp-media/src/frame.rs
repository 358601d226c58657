//! Still-frame representation

use crate::error::{MediaError, MediaResult};
use std::time::{SystemTime, UNIX_EPOCH};

/// One still image sampled from the live feed
///
/// Pixels are packed RGB8, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Packed RGB8 pixel data
    pub data: Vec<u8>,
    /// Capture timestamp in milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl VideoFrame {
    /// Create a frame stamped with the current time
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            width,
            height,
            data,
            timestamp,
        }
    }

    /// Number of bytes an RGB8 buffer of these dimensions must hold
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Check that dimensions and buffer agree
    pub fn validate(&self) -> MediaResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MediaError::InvalidFrameData {
                expected: 1,
                actual: 0,
            });
        }
        if self.data.len() != self.expected_len() {
            return Err(MediaError::InvalidFrameData {
                expected: self.expected_len(),
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}
