//! Verification state machine
//!
//! `VerificationFlow` is the single owner of the user-facing phase and of
//! every resource an attempt holds: the camera, the liveness connection with
//! its frame timer, the selected document and the outcome. All transitions
//! run through `&mut self`, so they are serialized by construction.
//!
//! ```text
//! camera --CONNECTED--> liveness --SUCCESS--> upload --submit--> verifying
//!    |                     |                                      |     |
//!    +---------------------+--------------> error <---------------+     v
//!                                                                    success
//! ```

use crate::config::VerifyConfig;
use crate::phase::{LivenessProgress, VerificationPhase};
use crate::presentation::UserIntent;
use crate::submitter::{
    DocumentSubmitter, IdentityDocument, Submission, VerificationOutcome, VerificationTransport,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use verifydlp_core::VerifyError;
use verifydlp_media::{default_backend, CameraBackend, FrameEncoder, MediaCapture};
use verifydlp_stream::{FramePayloadSource, StreamEvent, StreamEvents, StreamingClient};

const EVENT_CAPACITY: usize = 64;

/// Notifications published to presenters
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    /// The phase changed
    PhaseChanged {
        /// Previous phase
        from: VerificationPhase,
        /// New phase
        to: VerificationPhase,
    },
    /// The liveness counter moved
    ProgressUpdated(LivenessProgress),
    /// A document was accepted for submission
    DocumentSelected {
        /// Display name of the document
        file_name: String,
    },
    /// A transient notice for the user
    Notice {
        /// Headline
        title: String,
        /// Optional detail line
        description: Option<String>,
    },
}

/// Read-only snapshot of the flow for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowView {
    /// Current phase
    pub phase: VerificationPhase,
    /// Liveness progress
    pub progress: LivenessProgress,
    /// Session id issued after liveness
    pub session_id: Option<String>,
    /// Selected document name
    pub document_name: Option<String>,
    /// Whether `submit` would send a request
    pub can_submit: bool,
    /// Verification outcome, once verified
    pub outcome: Option<VerificationOutcome>,
    /// Message shown in the error phase
    pub error: Option<String>,
}

/// Builder for `VerificationFlow`
pub struct FlowBuilder {
    config: VerifyConfig,
    camera: Option<Box<dyn CameraBackend>>,
    transport: Option<Arc<dyn VerificationTransport>>,
}

impl FlowBuilder {
    fn new() -> Self {
        Self {
            config: VerifyConfig::default(),
            camera: None,
            transport: None,
        }
    }

    /// Use a complete configuration
    pub fn config(mut self, config: VerifyConfig) -> Self {
        self.config = config;
        self
    }

    /// Point both endpoints at another service address
    pub fn service_url(mut self, base_url: &str) -> Self {
        self.config.service.base_url = base_url.to_string();
        self
    }

    /// Use a specific camera backend
    pub fn camera(mut self, backend: Box<dyn CameraBackend>) -> Self {
        self.camera = Some(backend);
        self
    }

    /// Use a specific verification transport instead of HTTP
    pub fn transport(mut self, transport: Arc<dyn VerificationTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the configuration and assemble the flow
    pub fn build(self) -> Result<VerificationFlow, VerifyError> {
        self.config.validate()?;

        let stream_url = self.config.service.stream_url()?;
        let submitter = match self.transport {
            Some(transport) => DocumentSubmitter::new(transport),
            None => DocumentSubmitter::http(&self.config.service)?,
        };
        let encoder = FrameEncoder::new(self.config.encoder.clone())?;
        let capture = MediaCapture::new(
            self.camera.unwrap_or_else(default_backend),
            self.config.capture.clone(),
        );
        let video_ready = capture.subscribe_ready();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(VerificationFlow {
            progress: LivenessProgress::new(self.config.liveness_target),
            config: self.config,
            phase: VerificationPhase::Camera,
            session_id: None,
            document: None,
            outcome: None,
            error: None,
            capture,
            encoder,
            video_ready,
            stream: None,
            stream_events: None,
            stream_url,
            submitter,
            attempt: None,
            events,
        })
    }
}

enum Step {
    Stream(Option<StreamEvent>),
    VideoChanged,
    Idle,
}

/// Client-side identity verification flow
pub struct VerificationFlow {
    config: VerifyConfig,
    phase: VerificationPhase,
    session_id: Option<String>,
    document: Option<IdentityDocument>,
    outcome: Option<VerificationOutcome>,
    error: Option<String>,
    progress: LivenessProgress,
    capture: MediaCapture,
    encoder: FrameEncoder,
    video_ready: watch::Receiver<bool>,
    stream: Option<StreamingClient>,
    stream_events: Option<StreamEvents>,
    stream_url: String,
    submitter: DocumentSubmitter,
    attempt: Option<Uuid>,
    events: broadcast::Sender<FlowEvent>,
}

impl VerificationFlow {
    /// Start configuring a flow
    pub fn builder() -> FlowBuilder {
        FlowBuilder::new()
    }

    /// Acquire the camera and open the liveness connection
    ///
    /// The phase moves to liveness when the service answers CONNECTED. A
    /// camera failure moves straight to error without opening a connection.
    pub async fn start_capture(&mut self) -> Result<(), VerifyError> {
        if self.phase != VerificationPhase::Camera {
            warn!(phase = %self.phase, "Ignoring start outside the camera phase");
            return Ok(());
        }
        self.close_stream();

        let attempt = Uuid::new_v4();
        self.attempt = Some(attempt);
        self.progress = LivenessProgress::new(self.config.liveness_target);
        info!(attempt = %attempt, "Starting liveness attempt");

        if let Err(e) = self.capture.start().await {
            let err = VerifyError::from(e);
            self.fail(&err);
            return Err(err);
        }

        match StreamingClient::connect(&self.stream_url, self.config.stream.clone()).await {
            Ok((client, events)) => {
                self.stream = Some(client);
                self.stream_events = Some(events);
                Ok(())
            }
            Err(e) => {
                let err = VerifyError::from(e);
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Apply one event from the liveness connection
    pub async fn apply_stream_event(&mut self, event: StreamEvent) {
        if !self.phase.is_capturing() {
            debug!(phase = %self.phase, ?event, "Ignoring stream event");
            return;
        }

        match event {
            StreamEvent::Opened => {
                debug!(attempt = ?self.attempt, "Liveness connection open");
                self.try_begin_streaming().await;
            }
            StreamEvent::Connected => {
                self.set_phase(VerificationPhase::Liveness);
                self.try_begin_streaming().await;
            }
            StreamEvent::Progress { consecutive_real } => {
                if self.phase == VerificationPhase::Liveness {
                    self.progress.consecutive_real = consecutive_real;
                    debug!("Liveness progress {}", self.progress.fraction());
                    self.publish(FlowEvent::ProgressUpdated(self.progress));
                }
            }
            StreamEvent::LivenessVerified { session_id } => {
                info!(attempt = ?self.attempt, "Liveness verified, awaiting session");
                if session_id.is_some() {
                    self.session_id = session_id;
                }
            }
            StreamEvent::Finalized { session_id } => {
                self.session_id = session_id.or_else(|| self.session_id.take());
                if self.session_id.is_none() {
                    warn!("Liveness finalized without a session id");
                }
                self.publish(FlowEvent::Notice {
                    title: "Liveness Check Passed!".to_string(),
                    description: None,
                });
                self.close_stream();
                self.capture.stop();
                self.set_phase(VerificationPhase::Upload);
            }
            StreamEvent::Failed { message } => {
                self.fail(&VerifyError::LivenessRejected { message });
            }
            StreamEvent::TransportError { reason } => {
                let url = self.stream_url.clone();
                self.fail(&VerifyError::ConnectionFailed { url, reason });
            }
            StreamEvent::Closed => {
                if self.stream.is_some() {
                    self.fail(&VerifyError::ConnectionClosed);
                }
            }
        }
    }

    /// Process the next stream event or camera readiness change
    ///
    /// Returns `false` when there is nothing left to wait for.
    pub async fn next_step(&mut self) -> bool {
        let step = {
            let Some(events) = self.stream_events.as_mut() else {
                return false;
            };
            let video_ready = &mut self.video_ready;
            tokio::select! {
                event = events.recv() => Step::Stream(event),
                changed = video_ready.changed() => match changed {
                    Ok(()) => Step::VideoChanged,
                    Err(_) => Step::Idle,
                },
            }
        };

        match step {
            Step::Stream(Some(event)) => {
                self.apply_stream_event(event).await;
                true
            }
            Step::Stream(None) => {
                debug!("Liveness event channel finished");
                self.stream_events = None;
                true
            }
            Step::VideoChanged => {
                let ready = *self.video_ready.borrow_and_update();
                debug!(ready, "Camera readiness changed");
                if ready {
                    self.try_begin_streaming().await;
                }
                true
            }
            Step::Idle => false,
        }
    }

    /// Run the liveness stage until it passes or fails
    pub async fn drive_liveness(&mut self) -> VerificationPhase {
        while self.phase.is_capturing() {
            if !self.next_step().await {
                break;
            }
        }
        self.phase
    }

    /// Accept the ID document for submission
    ///
    /// Ignored outside the upload phase.
    pub fn select_document(&mut self, document: IdentityDocument) -> bool {
        if self.phase != VerificationPhase::Upload {
            warn!(phase = %self.phase, "Ignoring document outside the upload phase");
            return false;
        }
        info!(file = %document.file_name, media_type = %document.media_type, "Document selected");
        self.publish(FlowEvent::DocumentSelected {
            file_name: document.file_name.clone(),
        });
        self.document = Some(document);
        true
    }

    /// Submit the document with the liveness session id
    ///
    /// Returns `false` without sending anything when either is missing.
    pub async fn submit(&mut self) -> bool {
        if self.phase != VerificationPhase::Upload || !self.can_submit() {
            debug!(phase = %self.phase, "Submission not possible");
            return false;
        }

        self.set_phase(VerificationPhase::Verifying);
        let submission = self
            .submitter
            .submit(self.session_id.as_deref(), self.document.as_ref())
            .await;

        match submission {
            Submission::Completed(Ok(outcome)) => {
                self.publish(FlowEvent::Notice {
                    title: "Identity Verification Complete!".to_string(),
                    description: Some(format!(
                        "{} ({})",
                        outcome.message, outcome.recognito_result
                    )),
                });
                self.outcome = Some(outcome);
                self.set_phase(VerificationPhase::Success);
            }
            Submission::Completed(Err(e)) => self.fail(&e),
            Submission::Declined => {
                self.set_phase(VerificationPhase::Upload);
                return false;
            }
        }
        true
    }

    /// Tear everything down and return to the camera phase
    ///
    /// Safe from any phase and any number of times.
    pub fn reset(&mut self) {
        self.close_stream();
        self.capture.stop();
        self.session_id = None;
        self.document = None;
        self.outcome = None;
        self.error = None;
        self.attempt = None;
        self.progress = LivenessProgress::new(self.config.liveness_target);
        self.set_phase(VerificationPhase::Camera);
    }

    /// Handle a user intent from the presentation layer
    pub async fn dispatch(&mut self, intent: UserIntent) -> VerificationPhase {
        match intent {
            UserIntent::Start => {
                // Failures are reflected in the phase.
                let _ = self.start_capture().await;
            }
            UserIntent::ChooseDocument(document) => {
                self.select_document(document);
            }
            UserIntent::Submit => {
                self.submit().await;
            }
            UserIntent::Retry => self.reset(),
        }
        self.phase
    }

    /// Snapshot for rendering
    pub fn view(&self) -> FlowView {
        FlowView {
            phase: self.phase,
            progress: self.progress,
            session_id: self.session_id.clone(),
            document_name: self.document.as_ref().map(|d| d.file_name.clone()),
            can_submit: self.phase == VerificationPhase::Upload && self.can_submit(),
            outcome: self.outcome.clone(),
            error: self.error.clone(),
        }
    }

    /// Subscribe to flow notifications
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    /// Current phase
    pub fn phase(&self) -> VerificationPhase {
        self.phase
    }

    /// Session id issued after liveness
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Selected document
    pub fn document(&self) -> Option<&IdentityDocument> {
        self.document.as_ref()
    }

    /// Verification outcome
    pub fn outcome(&self) -> Option<&VerificationOutcome> {
        self.outcome.as_ref()
    }

    /// Message shown in the error phase
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Liveness progress
    pub fn progress(&self) -> LivenessProgress {
        self.progress
    }

    /// Whether the camera stream is held
    pub fn is_camera_active(&self) -> bool {
        self.capture.is_active()
    }

    /// Whether a liveness connection is held
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Whether frames are currently being sent
    pub fn is_streaming(&self) -> bool {
        self.stream.as_ref().map_or(false, |s| s.is_streaming())
    }

    /// Configuration in use
    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    fn can_submit(&self) -> bool {
        self.session_id.as_deref().map_or(false, |s| !s.is_empty()) && self.document.is_some()
    }

    async fn try_begin_streaming(&mut self) {
        if self.phase != VerificationPhase::Liveness || !self.capture.is_ready() {
            return;
        }
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        if !stream.is_ready() || stream.has_started() {
            return;
        }

        let tap = self.capture.frame_tap();
        let encoder = self.encoder.clone();
        let source: Arc<dyn FramePayloadSource> =
            Arc::new(move || encoder.encode_payload(tap.snapshot().as_ref()));

        info!(attempt = ?self.attempt, "Camera and connection ready, streaming frames");
        if let Err(e) = stream.begin_streaming(source).await {
            self.fail(&VerifyError::from(e));
        }
    }

    fn close_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.close();
        }
        self.stream_events = None;
    }

    fn fail(&mut self, err: &VerifyError) {
        error!(attempt = ?self.attempt, code = %err.error_code(), "Verification failed: {}", err);
        if self.phase.is_capturing() {
            self.close_stream();
            self.capture.stop();
        }
        self.error = Some(err.user_message());
        self.set_phase(VerificationPhase::Error);
    }

    fn set_phase(&mut self, to: VerificationPhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        info!(attempt = ?self.attempt, %from, %to, "Phase changed");
        self.publish(FlowEvent::PhaseChanged { from, to });
    }

    fn publish(&self, event: FlowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for VerificationFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationFlow")
            .field("phase", &self.phase)
            .field("attempt", &self.attempt)
            .field("session_id", &self.session_id)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}
