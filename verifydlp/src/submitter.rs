//! ID document submission
//!
//! One multipart POST per attempt carrying the liveness session id and the
//! document image. No retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use verifydlp_core::{ServiceConfig, VerifyError};

/// A user-selected identity document
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityDocument {
    /// Raw file content
    pub bytes: Vec<u8>,
    /// Declared media type, e.g. `image/jpeg`
    pub media_type: String,
    /// Display name
    pub file_name: String,
}

impl IdentityDocument {
    /// Document from in-memory content
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        media_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Read a document from disk, inferring the media type from its extension
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(Self {
            bytes,
            media_type: media_type_for(path).to_string(),
            file_name,
        })
    }

    /// Content length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the document has no content
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for IdentityDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityDocument")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn media_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Timing breakdown reported by the verification endpoint, in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Performance {
    /// End-to-end duration
    #[serde(deserialize_with = "null_as_default")]
    pub total_duration: f64,
    /// Document validation duration
    #[serde(deserialize_with = "null_as_default")]
    pub validation_duration: f64,
    /// Identity matching duration
    #[serde(deserialize_with = "null_as_default")]
    pub verification_duration: f64,
}

/// Per-stage status messages reported by the verification endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Session lookup
    #[serde(deserialize_with = "null_as_default")]
    pub db: String,
    /// Liveness session validation
    #[serde(deserialize_with = "null_as_default")]
    pub liveness_validation: String,
    /// ID card validation
    #[serde(deserialize_with = "null_as_default")]
    pub id_card_validation: String,
    /// Portrait extraction from the card
    #[serde(deserialize_with = "null_as_default")]
    pub portrait_extraction: String,
    /// Face matching
    #[serde(deserialize_with = "null_as_default")]
    pub verification: String,
}

/// Result of a document submission, kept as received
///
/// Missing and `null` fields read as their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Whether the identity was confirmed
    #[serde(default, deserialize_with = "null_as_default")]
    pub verified: bool,
    /// Result label from the matching engine, e.g. `MATCH`
    #[serde(default, deserialize_with = "null_as_default")]
    pub recognito_result: String,
    /// Session the result belongs to
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_id: String,
    /// Request correlation id
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_id: String,
    /// Timing breakdown
    #[serde(default, deserialize_with = "null_as_default")]
    pub performance: Performance,
    /// Per-stage messages
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Messages,
    /// Raw matching-engine response, when provided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recognito_response: Option<serde_json::Value>,
    /// Human-readable summary
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// Deserialize `null` as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl VerificationOutcome {
    /// Message for a rejected verification
    pub fn rejection_message(&self) -> String {
        if self.message.trim().is_empty() {
            "Verification failed".to_string()
        } else {
            self.message.clone()
        }
    }
}

/// Sends a document to the verification endpoint
#[async_trait]
pub trait VerificationTransport: Send + Sync {
    /// Perform one verification round trip
    async fn verify(
        &self,
        session_id: &str,
        document: &IdentityDocument,
    ) -> Result<VerificationOutcome, VerifyError>;
}

/// Multipart HTTP transport
#[derive(Debug, Clone)]
pub struct HttpVerificationTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpVerificationTransport {
    /// Transport posting to the service's verification endpoint
    pub fn new(service: &ServiceConfig) -> Result<Self, VerifyError> {
        let url = service.verify_url()?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| VerifyError::InvalidConfiguration {
                reason: format!("HTTP client: {}", e),
            })?;
        Ok(Self { client, url })
    }

    /// Endpoint address
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl VerificationTransport for HttpVerificationTransport {
    async fn verify(
        &self,
        session_id: &str,
        document: &IdentityDocument,
    ) -> Result<VerificationOutcome, VerifyError> {
        let part = reqwest::multipart::Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(&document.media_type)
            .map_err(|e| VerifyError::SubmissionTransport {
                status: None,
                reason: format!("invalid media type {}: {}", document.media_type, e),
            })?;
        let form = reqwest::multipart::Form::new()
            .text("session_id", session_id.to_string())
            .part("id_card", part);

        debug!("Posting {} bytes to {}", document.len(), self.url);
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VerifyError::SubmissionTransport {
                status: None,
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VerifyError::SubmissionTransport {
                status: Some(status.as_u16()),
                reason: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(VerifyError::SubmissionTransport {
                status: Some(status.as_u16()),
                reason: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|e| VerifyError::SubmissionTransport {
            status: Some(status.as_u16()),
            reason: format!("malformed response: {}", e),
        })
    }
}

/// Outcome of a submission request
#[derive(Debug)]
pub enum Submission {
    /// Session id or document missing; nothing was sent
    Declined,
    /// One round trip was made
    Completed(Result<VerificationOutcome, VerifyError>),
}

/// Gatekeeper in front of a `VerificationTransport`
#[derive(Clone)]
pub struct DocumentSubmitter {
    transport: Arc<dyn VerificationTransport>,
}

impl DocumentSubmitter {
    /// Submitter over any transport
    pub fn new(transport: Arc<dyn VerificationTransport>) -> Self {
        Self { transport }
    }

    /// Submitter over HTTP to the configured service
    pub fn http(service: &ServiceConfig) -> Result<Self, VerifyError> {
        Ok(Self::new(Arc::new(HttpVerificationTransport::new(service)?)))
    }

    /// Submit a document for a liveness session
    ///
    /// Declines without sending when the session id is empty or missing, or
    /// no document is given. A `verified: false` answer completes with
    /// `VerifyError::VerificationRejected`.
    pub async fn submit(
        &self,
        session_id: Option<&str>,
        document: Option<&IdentityDocument>,
    ) -> Submission {
        let (Some(session_id), Some(document)) = (session_id, document) else {
            debug!("Submission declined: session id or document missing");
            return Submission::Declined;
        };
        if session_id.is_empty() {
            debug!("Submission declined: empty session id");
            return Submission::Declined;
        }

        info!(session_id, file = %document.file_name, "Submitting ID document");
        let result = match self.transport.verify(session_id, document).await {
            Ok(outcome) if outcome.verified => {
                info!(result = %outcome.recognito_result, "Identity verified");
                Ok(outcome)
            }
            Ok(outcome) => {
                warn!(result = %outcome.recognito_result, "Identity not verified: {}", outcome.message);
                Err(VerifyError::VerificationRejected {
                    message: outcome.rejection_message(),
                })
            }
            Err(e) => {
                warn!("Document submission failed: {}", e);
                Err(e)
            }
        };
        Submission::Completed(result)
    }
}

impl std::fmt::Debug for DocumentSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSubmitter").finish_non_exhaustive()
    }
}
