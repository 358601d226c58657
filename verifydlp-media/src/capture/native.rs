//! Device camera via nokhwa
//!
//! The nokhwa camera handle is not `Send` on every platform, so it lives on a
//! dedicated capture thread that publishes the most recent decoded frame.

use crate::error::{MediaError, MediaResult};
use crate::frame::VideoFrame;
use crate::video_capture::{CameraBackend, CaptureConfig, FacingMode, VideoDevice};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::{Camera, NokhwaError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

struct CaptureWorker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl CaptureWorker {
    /// Signal the capture thread and detach it
    ///
    /// The thread may be blocked in a frame read; it stops the device stream
    /// once that read returns.
    fn release(self) {
        self.stop.store(true, Ordering::Release);
        if !self.handle.is_finished() {
            debug!("Detaching camera capture thread with a frame read pending");
        }
    }
}

/// Store a frame unless the worker was told to stop
fn publish(latest: &Mutex<Option<VideoFrame>>, stop: &AtomicBool, frame: VideoFrame) -> bool {
    let mut slot = latest.lock();
    if stop.load(Ordering::Acquire) {
        return false;
    }
    *slot = Some(frame);
    true
}

/// Camera backed by a platform capture device
pub struct NativeCamera {
    index: Option<u32>,
    latest: Arc<Mutex<Option<VideoFrame>>>,
    worker: Option<CaptureWorker>,
}

impl NativeCamera {
    /// Camera at a fixed device index
    pub fn new(index: u32) -> Self {
        Self {
            index: Some(index),
            latest: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }

    /// Camera picked at open time from the configured facing mode
    pub fn preferred() -> Self {
        Self {
            index: None,
            latest: Arc::new(Mutex::new(None)),
            worker: None,
        }
    }

    fn device_for(&self, facing: FacingMode) -> CameraIndex {
        let devices = match self.enumerate_devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("{}, trying device 0", e);
                return CameraIndex::Index(0);
            }
        };
        match facing.select(&devices) {
            Some(device) => {
                info!("Using camera {} ({}) for {:?} facing", device.name, device.id, facing);
                device_index(&device.id)
            }
            None => {
                warn!("No cameras enumerated, trying device 0");
                CameraIndex::Index(0)
            }
        }
    }
}

fn device_index(id: &str) -> CameraIndex {
    match id.parse() {
        Ok(index) => CameraIndex::Index(index),
        Err(_) => CameraIndex::String(id.to_string()),
    }
}

fn map_open_error(error: NokhwaError) -> MediaError {
    let reason = error.to_string();
    let lowered = reason.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("not authorized") {
        MediaError::PermissionDenied {
            operation: format!("open camera: {}", reason),
        }
    } else {
        MediaError::DeviceFailure { reason }
    }
}

impl CameraBackend for NativeCamera {
    fn enumerate_devices(&self) -> MediaResult<Vec<VideoDevice>> {
        let cameras = nokhwa::query(ApiBackend::Auto).map_err(|e| {
            MediaError::DeviceEnumerationFailed {
                reason: e.to_string(),
            }
        })?;
        Ok(cameras
            .into_iter()
            .map(|info| VideoDevice {
                id: info.index().to_string(),
                name: info.human_name(),
                description: info.description().to_string(),
            })
            .collect())
    }

    fn open(&mut self, config: &CaptureConfig) -> MediaResult<()> {
        self.close()?;

        let index = match self.index {
            Some(index) => CameraIndex::Index(index),
            None => self.device_for(config.facing_mode),
        };
        let label = index.to_string();
        let format = CameraFormat::new(
            Resolution::new(config.resolution.width, config.resolution.height),
            FrameFormat::MJPEG,
            config.framerate,
        );
        let stop = Arc::new(AtomicBool::new(false));
        let latest = Arc::clone(&self.latest);
        let worker_stop = Arc::clone(&stop);
        let (opened_tx, opened_rx) = mpsc::channel::<MediaResult<()>>();

        let handle = thread::Builder::new()
            .name("verifydlp-camera".to_string())
            .spawn(move || {
                let requested =
                    RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));
                let mut camera = match Camera::new(index, requested) {
                    Ok(camera) => camera,
                    Err(e) => {
                        let _ = opened_tx.send(Err(map_open_error(e)));
                        return;
                    }
                };
                if let Err(e) = camera.open_stream() {
                    let _ = opened_tx.send(Err(map_open_error(e)));
                    return;
                }
                let _ = opened_tx.send(Ok(()));

                while !worker_stop.load(Ordering::Acquire) {
                    match camera.frame().and_then(|buffer| buffer.decode_image::<RgbFormat>()) {
                        Ok(image) => {
                            let (width, height) = image.dimensions();
                            let frame = VideoFrame::new(width, height, image.into_raw());
                            if !publish(&latest, &worker_stop, frame) {
                                break;
                            }
                        }
                        Err(e) => {
                            debug!("Camera frame unavailable: {}", e);
                            thread::sleep(Duration::from_millis(10));
                        }
                    }
                }

                if let Err(e) = camera.stop_stream() {
                    warn!("Camera stream did not stop cleanly: {}", e);
                }
            })?;

        match opened_rx.recv() {
            Ok(Ok(())) => {
                info!("Native camera {} opened", label);
                self.worker = Some(CaptureWorker { stop, handle });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(MediaError::DeviceFailure {
                    reason: "capture thread exited before opening the camera".to_string(),
                })
            }
        }
    }

    fn close(&mut self) -> MediaResult<()> {
        if let Some(worker) = self.worker.take() {
            worker.release();
        }
        *self.latest.lock() = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.worker.is_some()
    }

    fn has_frame(&self) -> bool {
        self.latest.lock().is_some()
    }

    fn snapshot(&mut self) -> MediaResult<Option<VideoFrame>> {
        Ok(self.latest.lock().clone())
    }
}

impl Drop for NativeCamera {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
