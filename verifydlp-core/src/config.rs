//! Service endpoint configuration

use crate::VerifyError;
use serde::{Deserialize, Serialize};

/// Default base address of the liveness and verification service
pub const DEFAULT_SERVICE_URL: &str = "https://liveness-service-999275183993.us-central1.run.app";

/// Environment variable overriding the service base address
pub const SERVICE_URL_ENV: &str = "VERIFYDLP_SERVICE_URL";

/// Addresses of the remote liveness and verification endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base address (`https://` or `http://`)
    pub base_url: String,
    /// Path of the streaming liveness endpoint
    pub stream_path: String,
    /// Path of the document verification endpoint
    pub verify_path: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_URL.to_string(),
            stream_path: "/stream-liveness".to_string(),
            verify_path: "/session-verify".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Config pointing at a specific base address with default paths
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults, with the base address taken from `VERIFYDLP_SERVICE_URL` when set
    pub fn from_env() -> Self {
        match std::env::var(SERVICE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                tracing::debug!("Service address overridden by {}: {}", SERVICE_URL_ENV, url);
                Self::with_base_url(url.trim())
            }
            _ => Self::default(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), VerifyError> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(VerifyError::InvalidConfiguration {
                reason: format!("base_url must be http(s), got {}", self.base_url),
            });
        }
        for (name, path) in [("stream_path", &self.stream_path), ("verify_path", &self.verify_path)] {
            if !path.starts_with('/') {
                return Err(VerifyError::InvalidConfiguration {
                    reason: format!("{} must start with '/', got {}", name, path),
                });
            }
        }
        Ok(())
    }

    /// WebSocket address of the streaming liveness endpoint
    ///
    /// `https://` maps to `wss://` and `http://` to `ws://`.
    pub fn stream_url(&self) -> Result<String, VerifyError> {
        self.validate()?;
        let base = self.trimmed_base();
        let ws_base = match base.strip_prefix("https://") {
            Some(rest) => format!("wss://{}", rest),
            None => format!("ws://{}", base.trim_start_matches("http://")),
        };
        Ok(format!("{}{}", ws_base, self.stream_path))
    }

    /// HTTP address of the document verification endpoint
    pub fn verify_url(&self) -> Result<String, VerifyError> {
        self.validate()?;
        Ok(format!("{}{}", self.trimmed_base(), self.verify_path))
    }

    fn trimmed_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Serde adapter storing a `Duration` as whole milliseconds
pub mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize as milliseconds
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    /// Deserialize from milliseconds
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls() {
        let config = ServiceConfig::default();
        assert_eq!(
            config.stream_url().unwrap(),
            "wss://liveness-service-999275183993.us-central1.run.app/stream-liveness"
        );
        assert_eq!(
            config.verify_url().unwrap(),
            "https://liveness-service-999275183993.us-central1.run.app/session-verify"
        );
    }

    #[test]
    fn test_plain_http_maps_to_ws() {
        let config = ServiceConfig::with_base_url("http://127.0.0.1:8080/");
        assert_eq!(config.stream_url().unwrap(), "ws://127.0.0.1:8080/stream-liveness");
        assert_eq!(config.verify_url().unwrap(), "http://127.0.0.1:8080/session-verify");
    }

    #[test]
    fn test_invalid_scheme_rejected() {
        let config = ServiceConfig::with_base_url("ftp://example.com");
        let err = config.stream_url().unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIGURATION");

        let mut config = ServiceConfig::default();
        config.verify_path = "session-verify".to_string();
        tokio_test::assert_err!(config.validate());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{"base_url":"http://localhost:9000"}"#).unwrap();
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.stream_path, "/stream-liveness");
        assert_eq!(config.verify_path, "/session-verify");
    }
}
