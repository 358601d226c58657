//! Configuration types and defaults

use serde::{Deserialize, Serialize};
use verifydlp_core::{ServiceConfig, VerifyError};
use verifydlp_media::{CaptureConfig, EncoderConfig};
use verifydlp_stream::StreamConfig;

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable debug logging when `RUST_LOG` is not set
    pub debug_logging: bool,
}

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Remote service addresses
    pub service: ServiceConfig,
    /// Camera settings
    pub capture: CaptureConfig,
    /// Frame streaming settings
    pub stream: StreamConfig,
    /// Frame compression settings
    pub encoder: EncoderConfig,
    /// Consecutive real frames shown as 100% progress
    pub liveness_target: u32,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            capture: CaptureConfig::default(),
            stream: StreamConfig::default(),
            encoder: EncoderConfig::default(),
            liveness_target: 5,
            logging: LoggingConfig::default(),
        }
    }
}

impl VerifyConfig {
    /// Defaults, with the service address taken from the environment when set
    pub fn from_env() -> Self {
        Self {
            service: ServiceConfig::from_env(),
            ..Self::default()
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), VerifyError> {
        self.service.validate()?;
        self.capture
            .validate()
            .map_err(|e| VerifyError::InvalidConfiguration {
                reason: e.to_string(),
            })?;
        self.encoder
            .validate()
            .map_err(|e| VerifyError::InvalidConfiguration {
                reason: e.to_string(),
            })?;
        if self.stream.frame_interval.is_zero() {
            return Err(VerifyError::InvalidConfiguration {
                reason: "frame_interval must be > 0".to_string(),
            });
        }
        if self.liveness_target == 0 {
            return Err(VerifyError::InvalidConfiguration {
                reason: "liveness_target must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
