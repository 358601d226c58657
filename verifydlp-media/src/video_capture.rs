//! Camera capture with readiness gating
//!
//! `MediaCapture` owns exactly one camera backend and a readiness flag. Frame
//! transmission must not begin until the camera can actually render frames,
//! but some devices never report that clearly, so readiness is also asserted
//! unconditionally once `ready_timeout` elapses. That fallback is a
//! best-effort heuristic, not a guarantee that frames are flowing.

use crate::error::{MediaError, MediaResult};
use crate::frame::VideoFrame;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How often the readiness watcher asks the backend for a renderable frame
const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Video resolution information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoResolution {
    pub width: u32,
    pub height: u32,
}

impl VideoResolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const VGA: Self = Self::new(640, 480);

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }
}

/// Which camera to prefer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Camera facing the user (selfie camera; the default device on desktops)
    User,
    /// Camera facing away from the user
    Environment,
}

impl FacingMode {
    fn keywords(self) -> &'static [&'static str] {
        match self {
            FacingMode::User => &["front", "user", "facetime", "integrated", "webcam", "selfie"],
            FacingMode::Environment => &["back", "rear", "environment", "world"],
        }
    }

    fn opposite(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }

    /// Pick the device that faces this way, else the first device
    pub fn select(self, devices: &[VideoDevice]) -> Option<&VideoDevice> {
        devices
            .iter()
            .find(|device| device.faces(self) && !device.faces(self.opposite()))
            .or_else(|| devices.first())
    }
}

/// Camera capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub resolution: VideoResolution,
    pub facing_mode: FacingMode,
    pub framerate: u32,
    /// Upper bound on waiting for the camera to report a renderable frame
    #[serde(with = "verifydlp_core::config::duration_millis")]
    pub ready_timeout: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            resolution: VideoResolution::VGA,
            facing_mode: FacingMode::User,
            framerate: 30,
            ready_timeout: Duration::from_secs(3),
        }
    }
}

impl CaptureConfig {
    /// Validate configuration
    pub fn validate(&self) -> MediaResult<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Invalid resolution".to_string(),
            });
        }

        if self.framerate == 0 || self.framerate > 120 {
            return Err(MediaError::InvalidConfiguration {
                message: "Invalid framerate".to_string(),
            });
        }

        if self.ready_timeout.is_zero() {
            return Err(MediaError::InvalidConfiguration {
                message: "ready_timeout must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Video device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl VideoDevice {
    /// Whether the device name or description suggests the given facing
    pub fn faces(&self, facing: FacingMode) -> bool {
        let label = format!("{} {}", self.name, self.description).to_lowercase();
        facing.keywords().iter().any(|keyword| label.contains(keyword))
    }
}

/// Platform-specific camera backend
///
/// Implementations are driven from one owner at a time; `MediaCapture`
/// serializes access behind a mutex.
pub trait CameraBackend: Send {
    fn enumerate_devices(&self) -> MediaResult<Vec<VideoDevice>>;
    /// Acquire the device. Permission and device failures surface here.
    fn open(&mut self, config: &CaptureConfig) -> MediaResult<()>;
    /// Release the device. Must be safe to call when not open.
    fn close(&mut self) -> MediaResult<()>;
    fn is_open(&self) -> bool;
    /// Whether the device has produced a frame that can be rendered
    fn has_frame(&self) -> bool;
    /// Latest frame, or `None` when nothing is available yet
    fn snapshot(&mut self) -> MediaResult<Option<VideoFrame>>;
}

type SharedBackend = Arc<Mutex<Box<dyn CameraBackend>>>;

/// Camera capture manager
pub struct MediaCapture {
    backend: SharedBackend,
    config: CaptureConfig,
    ready_tx: Arc<watch::Sender<bool>>,
    ready_task: Option<JoinHandle<()>>,
    active: bool,
}

impl MediaCapture {
    /// Create a capture manager around a backend
    pub fn new(backend: Box<dyn CameraBackend>, config: CaptureConfig) -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            backend: Arc::new(Mutex::new(backend)),
            config,
            ready_tx: Arc::new(ready_tx),
            ready_task: None,
            active: false,
        }
    }

    /// Acquire the camera and arm the readiness watcher
    ///
    /// Any stream already held is released first.
    pub async fn start(&mut self) -> MediaResult<()> {
        self.config.validate()?;
        if self.active {
            debug!("Releasing previous camera stream before restart");
            self.stop();
        }

        let backend = Arc::clone(&self.backend);
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || backend.lock().open(&config))
            .await
            .map_err(|e| MediaError::DeviceFailure {
                reason: format!("camera open task failed: {}", e),
            })??;

        self.active = true;
        info!(
            "Camera started at {}x{}",
            self.config.resolution.width, self.config.resolution.height
        );

        let backend = Arc::clone(&self.backend);
        let ready_tx = Arc::clone(&self.ready_tx);
        let ready_timeout = self.config.ready_timeout;
        self.ready_task = Some(tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + ready_timeout;
            let mut poll = tokio::time::interval(READY_POLL_INTERVAL);
            loop {
                tokio::select! {
                    _ = poll.tick() => {
                        if backend.lock().has_frame() {
                            debug!("Camera reported a renderable frame");
                            ready_tx.send_replace(true);
                            return;
                        }
                    }
                    _ = tokio::time::sleep_until(deadline) => {
                        warn!("Camera gave no ready signal within {:?}, assuming ready", ready_timeout);
                        ready_tx.send_replace(true);
                        return;
                    }
                }
            }
        }));

        Ok(())
    }

    /// Release all media and clear readiness. Safe to call when never started.
    pub fn stop(&mut self) {
        if let Some(task) = self.ready_task.take() {
            task.abort();
        }
        self.ready_tx.send_replace(false);

        if self.active {
            if let Err(e) = self.backend.lock().close() {
                warn!("Camera close reported an error: {}", e);
            }
            self.active = false;
            info!("Camera stopped");
        }
    }

    /// Whether a camera stream is currently held
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the camera is ready for frame sampling
    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    /// Subscribe to readiness changes
    pub fn subscribe_ready(&self) -> watch::Receiver<bool> {
        self.ready_tx.subscribe()
    }

    /// Read-only snapshot handle for periodic frame sampling
    pub fn frame_tap(&self) -> FrameTap {
        FrameTap {
            backend: Arc::clone(&self.backend),
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }
}

impl Drop for MediaCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Snapshot access to a capture backend
///
/// Yields nothing once the owning `MediaCapture` has stopped.
#[derive(Clone)]
pub struct FrameTap {
    backend: SharedBackend,
}

impl FrameTap {
    /// Current frame, if the camera is open and has one
    pub fn snapshot(&self) -> Option<VideoFrame> {
        let mut backend = self.backend.lock();
        if !backend.is_open() {
            return None;
        }
        match backend.snapshot() {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Snapshot failed, skipping: {}", e);
                None
            }
        }
    }
}

impl std::fmt::Debug for FrameTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameTap").finish_non_exhaustive()
    }
}
