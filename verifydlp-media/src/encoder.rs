//! Still-frame encoding for transport
//!
//! Frames are compressed to baseline JPEG at their native dimensions and
//! carried as standard base64 text (no data-URL prefix).

use crate::error::{MediaError, MediaResult};
use crate::frame::VideoFrame;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Frame encoder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// JPEG quality, 1-100
    pub quality: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self { quality: 80 }
    }
}

impl EncoderConfig {
    /// Validate configuration
    pub fn validate(&self) -> MediaResult<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(MediaError::InvalidConfiguration {
                message: format!("JPEG quality must be 1-100, got {}", self.quality),
            });
        }
        Ok(())
    }
}

/// Stateless frame-to-payload transformation
#[derive(Debug, Clone, Default)]
pub struct FrameEncoder {
    config: EncoderConfig,
}

impl FrameEncoder {
    pub fn new(config: EncoderConfig) -> MediaResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Compress a frame to JPEG bytes
    pub fn encode_jpeg(&self, frame: &VideoFrame) -> MediaResult<Vec<u8>> {
        frame.validate()?;
        let mut out = Vec::with_capacity(frame.data.len() / 8);
        let mut encoder = JpegEncoder::new_with_quality(&mut out, self.config.quality);
        encoder
            .encode(&frame.data, frame.width, frame.height, ExtendedColorType::Rgb8)
            .map_err(|e| MediaError::EncodingFailed {
                codec: "JPEG".to_string(),
                reason: e.to_string(),
            })?;
        Ok(out)
    }

    /// Base64 JPEG payload for the current frame
    ///
    /// Returns `None` when no frame is available or it cannot be encoded;
    /// that is a missed tick, not an error.
    pub fn encode_payload(&self, frame: Option<&VideoFrame>) -> Option<String> {
        let frame = frame?;
        match self.encode_jpeg(frame) {
            Ok(jpeg) => Some(BASE64_STANDARD.encode(jpeg)),
            Err(e) => {
                debug!("Skipping frame: {}", e);
                None
            }
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }
}
