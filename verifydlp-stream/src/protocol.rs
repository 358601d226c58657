//! Liveness streaming protocol messages

use serde::{Deserialize, Serialize};

/// Messages sent from the client to the liveness service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// Control command, e.g. `{"command":"start_verification"}`
    Command {
        /// Command name
        command: String,
    },
    /// One encoded frame, `{"frame":"<base64 JPEG>"}`
    Frame {
        /// Base64 JPEG without a data-URL prefix
        frame: String,
    },
}

impl ClientMessage {
    /// Command that starts frame analysis
    pub const START_VERIFICATION: &'static str = "start_verification";

    /// The start command, sent once per liveness attempt
    pub fn start_verification() -> Self {
        ClientMessage::Command {
            command: Self::START_VERIFICATION.to_string(),
        }
    }

    /// A frame envelope
    pub fn frame(payload: String) -> Self {
        ClientMessage::Frame { frame: payload }
    }
}

/// Status values reported by the liveness service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LivenessStatus {
    /// Connection accepted, ready for analysis
    Connected,
    /// Frame analysed, carries the consecutive-real counter
    Analyzing,
    /// Liveness passed; finalization follows
    Verified,
    /// Session finalized, carries the session id
    Success,
    /// No decision within the service's window
    Timeout,
    /// Any status this client does not know
    #[serde(other)]
    Unknown,
}

/// Status envelope sent by the liveness service
///
/// Every field is optional on the wire. Fields are decoded leniently: a value
/// of an unexpected type never rejects the whole message, and empty strings
/// read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Status tag
    #[serde(default, deserialize_with = "lenient::status")]
    pub status: Option<LivenessStatus>,
    /// Human-readable message
    #[serde(default, deserialize_with = "lenient::text")]
    pub message: Option<String>,
    /// Session id, present on VERIFIED and SUCCESS
    #[serde(default, deserialize_with = "lenient::text")]
    pub session_id: Option<String>,
    /// Consecutive frames classified as real
    #[serde(default, deserialize_with = "lenient::counter")]
    pub consecutive_real: Option<u32>,
    /// Error description
    #[serde(default, deserialize_with = "lenient::text")]
    pub error: Option<String>,
    /// Confidence of the best frame kept by the service
    #[serde(default, deserialize_with = "lenient::number")]
    pub best_frame_confidence: Option<f64>,
    /// Opaque verification details
    #[serde(default)]
    pub verification_result: Option<serde_json::Value>,
}

impl StatusMessage {
    /// Failure text: the message, else the error, else a generic default
    pub fn failure_text(&self) -> String {
        non_blank(&self.message)
            .or_else(|| non_blank(&self.error))
            .map(str::to_string)
            .unwrap_or_else(|| "Liveness detection failed".to_string())
    }

    /// Whether the message carries a non-empty error
    pub fn has_error(&self) -> bool {
        non_blank(&self.error).is_some()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.trim().is_empty())
}

/// Field decoders that fall back to `None` instead of failing
mod lenient {
    use super::LivenessStatus;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn status<'de, D: Deserializer<'de>>(d: D) -> Result<Option<LivenessStatus>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => None,
            value => Some(LivenessStatus::deserialize(value).unwrap_or(LivenessStatus::Unknown)),
        })
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let text = match Value::deserialize(d)? {
            Value::Null => None,
            Value::String(text) => Some(text),
            Value::Object(fields) => {
                let detail = fields
                    .get("message")
                    .or_else(|| fields.get("detail"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Some(detail.unwrap_or_else(|| Value::Object(fields).to_string()))
            }
            other => Some(other.to_string()),
        };
        Ok(text.filter(|text| !text.trim().is_empty()))
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
    }

    /// Any number, clamped at zero and truncated
    pub fn counter<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(number(d)?
            .filter(|n| n.is_finite())
            .map(|n| n.clamp(0.0, u32::MAX as f64) as u32))
    }
}
