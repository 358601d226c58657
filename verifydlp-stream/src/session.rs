//! Two-stage liveness protocol decoder
//!
//! One connection carries two consecutive conversations: first the liveness
//! decision (CONNECTED, ANALYZING, then VERIFIED), then finalization of the
//! session (SUCCESS or a failure). The stage is explicit state here rather
//! than a swapped message handler.

use crate::protocol::{LivenessStatus, StatusMessage};
use tracing::{debug, warn};

/// Events surfaced by the streaming client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The connection is open and ready to carry messages
    Opened,
    /// The service accepted the connection
    Connected,
    /// A frame was analysed
    Progress {
        /// Consecutive frames classified as real
        consecutive_real: u32,
    },
    /// Liveness passed; waiting for the session to be finalized
    LivenessVerified {
        /// Session id announced with the decision, if any
        session_id: Option<String>,
    },
    /// Session finalized
    Finalized {
        /// Session id for document verification
        session_id: Option<String>,
    },
    /// The service reported a timeout or an error
    Failed {
        /// Human-readable reason
        message: String,
    },
    /// The transport failed
    TransportError {
        /// Transport failure description
        reason: String,
    },
    /// The connection closed
    Closed,
}

/// Which conversation the connection is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolStage {
    /// Waiting for the liveness decision
    AwaitingLiveness,
    /// Liveness passed, waiting for SUCCESS
    AwaitingFinalization,
}

/// Stateful decoder turning service text frames into `StreamEvent`s
///
/// Malformed messages and statuses that mean nothing in the current stage
/// are logged and dropped.
#[derive(Debug, Clone)]
pub struct LivenessProtocol {
    stage: ProtocolStage,
    verified_session: Option<String>,
}

impl LivenessProtocol {
    /// Decoder at the start of a liveness attempt
    pub fn new() -> Self {
        Self {
            stage: ProtocolStage::AwaitingLiveness,
            verified_session: None,
        }
    }

    /// Current stage
    pub fn stage(&self) -> ProtocolStage {
        self.stage
    }

    /// Decode one text frame
    pub fn handle_text(&mut self, text: &str) -> Option<StreamEvent> {
        match serde_json::from_str::<StatusMessage>(text) {
            Ok(message) => self.handle_message(message),
            Err(e) => {
                warn!("Ignoring malformed liveness message: {} ({})", text, e);
                None
            }
        }
    }

    /// Decode one parsed status message
    pub fn handle_message(&mut self, message: StatusMessage) -> Option<StreamEvent> {
        debug!(stage = ?self.stage, status = ?message.status, "Liveness message");
        match self.stage {
            ProtocolStage::AwaitingLiveness => self.on_liveness(message),
            ProtocolStage::AwaitingFinalization => self.on_finalization(message),
        }
    }

    fn on_liveness(&mut self, message: StatusMessage) -> Option<StreamEvent> {
        match message.status {
            Some(LivenessStatus::Connected) => Some(StreamEvent::Connected),
            Some(LivenessStatus::Analyzing) => Some(StreamEvent::Progress {
                consecutive_real: message.consecutive_real.unwrap_or(0),
            }),
            Some(LivenessStatus::Verified) => {
                self.stage = ProtocolStage::AwaitingFinalization;
                self.verified_session = message.session_id.clone();
                Some(StreamEvent::LivenessVerified {
                    session_id: message.session_id,
                })
            }
            Some(LivenessStatus::Timeout) => Some(StreamEvent::Failed {
                message: message.failure_text(),
            }),
            _ if message.has_error() => Some(StreamEvent::Failed {
                message: message.failure_text(),
            }),
            _ => {
                debug!("Ignoring status {:?} while awaiting liveness", message.status);
                None
            }
        }
    }

    fn on_finalization(&mut self, message: StatusMessage) -> Option<StreamEvent> {
        match message.status {
            Some(LivenessStatus::Success) => Some(StreamEvent::Finalized {
                session_id: message.session_id.or_else(|| self.verified_session.clone()),
            }),
            Some(LivenessStatus::Timeout) => Some(StreamEvent::Failed {
                message: message.failure_text(),
            }),
            _ if message.has_error() => Some(StreamEvent::Failed {
                message: message.failure_text(),
            }),
            _ => {
                debug!("Ignoring status {:?} while awaiting finalization", message.status);
                None
            }
        }
    }
}

impl Default for LivenessProtocol {
    fn default() -> Self {
        Self::new()
    }
}
