//! Capture lifecycle tests
//!
//! Readiness gating, restart and teardown behaviour of `MediaCapture`
//! against the synthetic and image-sequence backends.

use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;
use verifydlp_media::*;

fn small_config() -> CaptureConfig {
    CaptureConfig {
        resolution: VideoResolution::new(32, 24),
        ..CaptureConfig::default()
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_capture_config_default() {
    let config = CaptureConfig::default();
    assert_eq!(config.resolution, VideoResolution::VGA);
    assert_eq!(config.facing_mode, FacingMode::User);
    assert_eq!(config.ready_timeout, Duration::from_secs(3));
    tokio_test::assert_ok!(config.validate());
}

#[test]
fn test_capture_config_rejects_zero_timeout() {
    let config = CaptureConfig {
        ready_timeout: Duration::ZERO,
        ..CaptureConfig::default()
    };
    tokio_test::assert_err!(config.validate());
}

// ============================================================================
// READINESS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_ready_on_first_renderable_frame() {
    let mut capture = MediaCapture::new(Box::new(SyntheticCamera::new()), small_config());
    let mut ready = capture.subscribe_ready();
    let started = Instant::now();

    capture.start().await.unwrap();
    assert!(capture.is_active());

    ready.wait_for(|r| *r).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(capture.is_ready());
}

#[tokio::test(start_paused = true)]
async fn test_ready_fallback_when_camera_stays_silent() {
    let mut capture = MediaCapture::new(Box::new(SyntheticCamera::silent()), small_config());
    let mut ready = capture.subscribe_ready();
    let started = Instant::now();

    capture.start().await.unwrap();
    assert!(!capture.is_ready());

    tokio::time::timeout(Duration::from_secs(10), ready.wait_for(|r| *r))
        .await
        .expect("fallback should assert readiness")
        .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_ready_timeout_is_configurable() {
    let config = CaptureConfig {
        ready_timeout: Duration::from_millis(500),
        ..small_config()
    };
    let mut capture = MediaCapture::new(Box::new(SyntheticCamera::silent()), config);
    let mut ready = capture.subscribe_ready();
    let started = Instant::now();

    capture.start().await.unwrap();
    ready.wait_for(|r| *r).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert!(started.elapsed() < Duration::from_secs(3));
}

// ============================================================================
// LIFECYCLE
// ============================================================================

#[tokio::test]
async fn test_permission_denied_surfaces_on_start() {
    let mut capture = MediaCapture::new(Box::new(SyntheticCamera::deny_permission()), small_config());
    let err = tokio_test::assert_err!(capture.start().await);
    assert_eq!(err.category(), ErrorCategory::Permission);
    assert!(!capture.is_active());
    assert!(!capture.is_ready());
}

#[tokio::test]
async fn test_stop_is_idempotent_and_safe_before_start() {
    let mut capture = MediaCapture::new(Box::new(SyntheticCamera::new()), small_config());
    capture.stop();
    capture.stop();
    assert!(!capture.is_active());

    capture.start().await.unwrap();
    capture.stop();
    capture.stop();
    assert!(!capture.is_active());
    assert!(!capture.is_ready());
}

#[tokio::test]
async fn test_restart_releases_previous_stream() {
    let camera = SyntheticCamera::new();
    let opens = camera.open_counter();
    let mut capture = MediaCapture::new(Box::new(camera), small_config());

    tokio_test::assert_ok!(capture.start().await);
    tokio_test::assert_ok!(capture.start().await);
    assert_eq!(opens.load(Ordering::SeqCst), 2);
    assert!(capture.is_active());
}

#[tokio::test]
async fn test_frame_tap_goes_dry_after_stop() {
    let mut capture = MediaCapture::new(Box::new(SyntheticCamera::new()), small_config());
    let tap = capture.frame_tap();
    assert!(tap.snapshot().is_none());

    capture.start().await.unwrap();
    let frame = tap.snapshot().expect("frame while capturing");
    assert_eq!((frame.width, frame.height), (32, 24));

    capture.stop();
    assert!(tap.snapshot().is_none());
}

#[tokio::test]
async fn test_image_sequence_replays_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("face.png");
    image::RgbImage::from_pixel(20, 10, image::Rgb([200, 150, 100]))
        .save(&path)
        .unwrap();

    let mut capture = MediaCapture::new(
        Box::new(ImageSequenceCamera::new([path.clone()])),
        CaptureConfig::default(),
    );
    capture.start().await.unwrap();

    let frame = capture.frame_tap().snapshot().unwrap();
    assert_eq!((frame.width, frame.height), (20, 10));
    assert_eq!(&frame.data[..3], &[200, 150, 100]);

    let encoder = FrameEncoder::default();
    assert!(encoder.encode_payload(Some(&frame)).is_some());
}

#[tokio::test]
async fn test_image_sequence_missing_file_is_device_error() {
    let mut capture = MediaCapture::new(
        Box::new(ImageSequenceCamera::new(["/nonexistent/verifydlp/face.png"])),
        CaptureConfig::default(),
    );
    let err = tokio_test::assert_err!(capture.start().await);
    assert!(err.is_acquisition_failure());
}

// ============================================================================
// DEVICE SELECTION
// ============================================================================

fn device(id: &str, name: &str, description: &str) -> VideoDevice {
    VideoDevice {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
    }
}

#[test]
fn test_user_facing_device_preferred() {
    let devices = vec![
        device("0", "Back Camera", "AVFoundation rear"),
        device("1", "FaceTime HD Camera", "AVFoundation"),
    ];
    let chosen = FacingMode::User.select(&devices).unwrap();
    assert_eq!(chosen.id, "1");
    assert_eq!(FacingMode::Environment.select(&devices).unwrap().id, "0");
}

#[test]
fn test_unlabelled_devices_fall_back_to_first() {
    let devices = vec![
        device("2", "USB2.0 Camera", "v4l2"),
        device("3", "HDMI Capture", "v4l2"),
    ];
    assert_eq!(FacingMode::User.select(&devices).unwrap().id, "2");
    assert!(FacingMode::User.select(&[]).is_none());
}

#[test]
fn test_ambiguous_label_is_not_a_match() {
    let devices = vec![
        device("0", "Integrated Camera", "front"),
        device("1", "Front/Back Switchable", "usb"),
    ];
    assert!(devices[1].faces(FacingMode::User));
    assert!(devices[1].faces(FacingMode::Environment));
    assert_eq!(FacingMode::Environment.select(&devices).unwrap().id, "0");
}
