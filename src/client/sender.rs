//! Capture sender
//!
//! Runs two independent loops per camera:
//!
//! ```text
//!   capture task                     upload task
//!   ┌──────────────────────┐         ┌────────────────────────┐
//!   │ tick (target fps)    │         │ recv from queue        │
//!   │ read + encode        │ bounded │ POST /upload/{camera}  │
//!   │ try_send ────────────┼──queue──┼─► on error: log,       │
//!   │ (full: drop frame)   │         │   back off, continue   │
//!   └──────────────────────┘         └────────────────────────┘
//! ```
//!
//! Capture never waits for the network: when the queue is full the new frame
//! is dropped. This is the opposite of the relay slot, which drops the old one.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{Error, Result};
use crate::relay::CameraId;
use crate::stats::{FrameRateWindow, SenderStats, SenderStatsSnapshot};

use super::camera::CameraDevice;
use super::codec::JpegCodec;
use super::config::SenderConfig;
use super::uploader::FrameUploader;

/// Captures, encodes and uploads frames for one camera
pub struct CaptureSender {
    config: SenderConfig,
    codec: JpegCodec,
    running: watch::Sender<bool>,
    stats: Arc<SenderStats>,
    capture_task: Option<JoinHandle<()>>,
    upload_task: Option<JoinHandle<()>>,
}

impl CaptureSender {
    /// Create a sender; nothing runs until [`start`](Self::start)
    pub fn new(config: SenderConfig) -> Result<Self> {
        config.validate()?;
        let codec = JpegCodec::new(config.quality, config.resize_factor)?;
        let (running, _) = watch::channel(false);

        Ok(Self {
            config,
            codec,
            running,
            stats: Arc::new(SenderStats::new()),
            capture_task: None,
            upload_task: None,
        })
    }

    /// Sender configuration
    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Camera this sender uploads for
    pub fn camera_id(&self) -> &CameraId {
        &self.config.camera_id
    }

    /// Current counters
    pub fn stats(&self) -> SenderStatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether the sender has been started and not stopped
    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Start capturing from `device` and uploading through `uploader`
    pub fn start<D, U>(&mut self, device: D, uploader: U) -> Result<()>
    where
        D: CameraDevice,
        U: FrameUploader,
    {
        if self.capture_task.is_some() {
            return Err(Error::Config(format!(
                "sender for {} already started",
                self.config.camera_id
            )));
        }

        let url = self.config.upload_url()?;
        let (queue_tx, queue_rx) = mpsc::channel(self.config.queue_capacity);
        self.running.send_replace(true);

        let capture = CaptureLoop {
            camera: self.config.camera_id.clone(),
            codec: self.codec,
            queue: queue_tx,
            running: self.running.subscribe(),
            stats: Arc::clone(&self.stats),
            interval: self.config.frame_interval(),
            stats_interval: self.config.stats_interval,
        };
        let upload = UploadLoop {
            camera: self.config.camera_id.clone(),
            queue: queue_rx,
            running: self.running.subscribe(),
            stats: Arc::clone(&self.stats),
            backoff: self.config.retry_backoff,
        };

        tracing::info!(
            camera = %self.config.camera_id,
            url = %url,
            fps = self.config.target_fps,
            quality = self.config.quality,
            queue = self.config.queue_capacity,
            "Capture sender started"
        );

        self.capture_task = Some(tokio::spawn(capture.run(device)));
        self.upload_task = Some(tokio::spawn(upload.run(uploader)));
        Ok(())
    }

    /// Stop capturing
    ///
    /// Best effort: the capture loop releases the device at its next step and
    /// the upload loop exits after its current request. Frames still queued
    /// are discarded and in-flight uploads are neither awaited nor cancelled.
    pub fn stop(&self) {
        if self.running.send_replace(false) {
            tracing::info!(camera = %self.config.camera_id, "Capture sender stopping");
        }
    }

    /// Wait for the capture loop to finish and the device to be released
    ///
    /// Returns once the loop has exited, either after [`stop`](Self::stop) or
    /// because the device failed.
    pub async fn join_capture(&mut self) {
        if let Some(task) = self.capture_task.take() {
            if let Err(e) = task.await {
                tracing::error!(camera = %self.config.camera_id, error = %e, "Capture task failed");
            }
        }
    }

    /// Whether the capture loop has exited
    pub fn capture_finished(&self) -> bool {
        self.capture_task
            .as_ref()
            .map_or(true, |task| task.is_finished())
    }
}

impl Drop for CaptureSender {
    fn drop(&mut self) {
        // Both loops also exit when the running channel closes
        self.running.send_replace(false);
        if let Some(task) = self.upload_task.take() {
            task.abort();
        }
    }
}

struct CaptureLoop {
    camera: CameraId,
    codec: JpegCodec,
    queue: mpsc::Sender<Bytes>,
    running: watch::Receiver<bool>,
    stats: Arc<SenderStats>,
    interval: Duration,
    stats_interval: Duration,
}

impl CaptureLoop {
    async fn run<D: CameraDevice>(mut self, mut device: D) {
        let (width, height) = device.resolution();
        tracing::debug!(camera = %self.camera, width, height, "Capture loop started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut rate = FrameRateWindow::default();
        let mut last_log = Instant::now();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.running.wait_for(|running| !*running) => break,
            }

            // Camera reads and JPEG encoding block, keep them off the runtime
            let codec = self.codec;
            let joined = tokio::task::spawn_blocking(move || {
                let result = capture_and_encode(&mut device, &codec);
                (device, result)
            })
            .await;

            let (returned, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!(camera = %self.camera, error = %e, "Capture worker panicked");
                    return;
                }
            };
            device = returned;

            match result {
                Ok(Some(jpeg)) => {
                    SenderStats::incr(&self.stats.frames_captured);
                    rate.tick();
                    if !self.enqueue(jpeg) {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::trace!(camera = %self.camera, "No frame available");
                }
                Err(Error::Device(e)) => {
                    tracing::error!(camera = %self.camera, error = %e, "Camera failure, capture stopped");
                    break;
                }
                Err(e) => {
                    tracing::warn!(camera = %self.camera, error = %e, "Failed to encode frame");
                }
            }

            if last_log.elapsed() >= self.stats_interval {
                let snapshot = self.stats.snapshot();
                tracing::info!(
                    camera = %self.camera,
                    fps = (rate.fps() * 10.0).round() / 10.0,
                    captured = snapshot.frames_captured,
                    dropped = snapshot.frames_dropped,
                    uploaded = snapshot.frames_uploaded,
                    failures = snapshot.upload_failures,
                    "Capture frame rate"
                );
                last_log = Instant::now();
            }
        }

        device.release();
        tracing::info!(camera = %self.camera, "Capture loop stopped, camera released");
    }

    /// Queue a frame without waiting; returns false once the upload side is gone
    fn enqueue(&self, jpeg: Bytes) -> bool {
        match self.queue.try_send(jpeg) {
            Ok(()) => {
                SenderStats::incr(&self.stats.frames_enqueued);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                SenderStats::incr(&self.stats.frames_dropped);
                tracing::trace!(camera = %self.camera, "Send queue full, frame dropped");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                SenderStats::incr(&self.stats.frames_dropped);
                tracing::debug!(camera = %self.camera, "Upload loop gone, stopping capture");
                false
            }
        }
    }
}

fn capture_and_encode<D: CameraDevice>(device: &mut D, codec: &JpegCodec) -> Result<Option<Bytes>> {
    match device.read() {
        Ok(Some(frame)) => codec.encode(&frame).map(Some),
        Ok(None) => Ok(None),
        Err(e) => Err(Error::Device(e)),
    }
}

struct UploadLoop {
    camera: CameraId,
    queue: mpsc::Receiver<Bytes>,
    running: watch::Receiver<bool>,
    stats: Arc<SenderStats>,
    backoff: Duration,
}

impl UploadLoop {
    async fn run<U: FrameUploader>(mut self, uploader: U) {
        loop {
            let frame = tokio::select! {
                frame = self.queue.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
                _ = self.running.wait_for(|running| !*running) => break,
            };

            let size = frame.len() as u64;
            match uploader.upload(&self.camera, frame).await {
                Ok(()) => {
                    SenderStats::incr(&self.stats.frames_uploaded);
                    self.stats
                        .bytes_uploaded
                        .fetch_add(size, Ordering::Relaxed);
                }
                Err(e) => {
                    SenderStats::incr(&self.stats.upload_failures);
                    tracing::warn!(camera = %self.camera, error = %e, "Error sending frame");
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }

        tracing::debug!(camera = %self.camera, "Upload loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    use image::RgbImage;
    use tokio::sync::Notify;

    use super::*;
    use crate::client::camera::{DeviceError, TestPatternCamera};

    /// Records uploads; optionally fails the first `fail_first` attempts
    #[derive(Default)]
    struct RecordingUploader {
        frames: Arc<Mutex<Vec<Bytes>>>,
        fail_first: u64,
        attempts: Arc<std::sync::atomic::AtomicU64>,
    }

    impl FrameUploader for RecordingUploader {
        async fn upload(&self, _camera: &CameraId, frame: Bytes) -> Result<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first {
                return Err(Error::Upload("connection refused".into()));
            }
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }
    }

    /// Never completes an upload until released
    struct StalledUploader {
        release: Arc<Notify>,
    }

    impl FrameUploader for StalledUploader {
        async fn upload(&self, _camera: &CameraId, _frame: Bytes) -> Result<()> {
            self.release.notified().await;
            Ok(())
        }
    }

    /// Test pattern device whose release is visible after the sender owns it
    struct TrackedCamera {
        inner: TestPatternCamera,
        released: Arc<AtomicBool>,
        stall_first_read: Option<Duration>,
    }

    impl TrackedCamera {
        fn new(inner: TestPatternCamera) -> (Self, Arc<AtomicBool>) {
            let released = Arc::new(AtomicBool::new(false));
            let camera = Self {
                inner,
                released: Arc::clone(&released),
                stall_first_read: None,
            };
            (camera, released)
        }

        fn stall_first_read(mut self, stall: Duration) -> Self {
            self.stall_first_read = Some(stall);
            self
        }
    }

    impl CameraDevice for TrackedCamera {
        fn read(&mut self) -> std::result::Result<Option<RgbImage>, DeviceError> {
            if let Some(stall) = self.stall_first_read.take() {
                std::thread::sleep(stall);
            }
            self.inner.read()
        }

        fn release(&mut self) {
            self.inner.release();
            self.released.store(true, Ordering::SeqCst);
        }

        fn resolution(&self) -> (u32, u32) {
            self.inner.resolution()
        }
    }

    fn config() -> SenderConfig {
        SenderConfig::new("http://127.0.0.1:5000", CameraId::parse("cam1").unwrap())
            .target_fps(200.0)
            .resolution(32, 24)
            .retry_backoff(Duration::from_millis(5))
    }

    fn camera() -> TestPatternCamera {
        TestPatternCamera::open(0, 32, 24).unwrap()
    }

    #[tokio::test]
    async fn test_frames_are_uploaded() {
        let uploader = RecordingUploader::default();
        let frames = Arc::clone(&uploader.frames);

        let mut sender = CaptureSender::new(config()).unwrap();
        sender.start(camera(), uploader).unwrap();
        assert!(sender.is_running());

        tokio::time::sleep(Duration::from_millis(200)).await;
        sender.stop();
        sender.join_capture().await;

        assert!(!sender.is_running());
        assert!(sender.capture_finished());

        let uploaded = frames.lock().unwrap().clone();
        assert!(!uploaded.is_empty());
        // Every payload is a JPEG
        assert!(uploaded.iter().all(|f| f.starts_with(&[0xFF, 0xD8])));

        let stats = sender.stats();
        assert!(stats.frames_captured >= stats.frames_enqueued);
        assert_eq!(
            stats.frames_captured,
            stats.frames_enqueued + stats.frames_dropped
        );
    }

    #[tokio::test]
    async fn test_full_queue_drops_newest() {
        let release = Arc::new(Notify::new());
        let uploader = StalledUploader {
            release: Arc::clone(&release),
        };

        let mut sender = CaptureSender::new(config().queue_capacity(1)).unwrap();
        sender.start(camera(), uploader).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        sender.stop();
        sender.join_capture().await;

        let stats = sender.stats();
        assert!(stats.frames_dropped > 0);
        // One frame held by the stalled upload plus one queued
        assert!(stats.frames_enqueued <= 2);
        assert_eq!(stats.frames_uploaded, 0);

        release.notify_waiters();
    }

    #[tokio::test]
    async fn test_upload_failures_are_retried_with_next_frame() {
        let uploader = RecordingUploader {
            fail_first: 3,
            ..Default::default()
        };
        let frames = Arc::clone(&uploader.frames);

        let mut sender = CaptureSender::new(config()).unwrap();
        sender.start(camera(), uploader).unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        sender.stop();
        sender.join_capture().await;

        let stats = sender.stats();
        assert_eq!(stats.upload_failures, 3);
        assert!(!frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_device_failure_stops_capture_only() {
        let uploader = RecordingUploader::default();
        let mut sender = CaptureSender::new(config()).unwrap();
        sender
            .start(camera().fail_after(3), uploader)
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), sender.join_capture())
            .await
            .expect("capture loop should end on device failure");

        assert_eq!(sender.stats().frames_captured, 3);
        // Sender was not stopped explicitly
        assert!(sender.is_running());
    }

    #[tokio::test]
    async fn test_capture_rate_follows_target_fps() {
        let mut sender = CaptureSender::new(config().target_fps(10.0)).unwrap();
        sender
            .start(camera(), RecordingUploader::default())
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        sender.stop();
        sender.join_capture().await;

        // First tick fires at once, then one every 100 ms
        let captured = sender.stats().frames_captured;
        assert!((5..=12).contains(&captured), "captured {captured} frames at 10 fps");
    }

    #[tokio::test]
    async fn test_slow_read_does_not_burst_missed_ticks() {
        let (device, _) = TrackedCamera::new(camera());
        let device = device.stall_first_read(Duration::from_millis(500));

        let mut sender = CaptureSender::new(config().target_fps(10.0)).unwrap();
        sender.start(device, RecordingUploader::default()).unwrap();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        sender.stop();
        sender.join_capture().await;

        // Ticks missed during the stall are skipped, not replayed
        let captured = sender.stats().frames_captured;
        assert!(captured <= 8, "captured {captured} frames after a 500 ms stall");
        assert!(captured >= 2);
    }

    #[tokio::test]
    async fn test_stop_releases_camera() {
        let (device, released) = TrackedCamera::new(camera());

        let mut sender = CaptureSender::new(config()).unwrap();
        sender.start(device, RecordingUploader::default()).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!released.load(Ordering::SeqCst));

        sender.stop();
        sender.join_capture().await;

        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_device_failure_releases_camera() {
        let (device, released) = TrackedCamera::new(camera().fail_after(2));

        let mut sender = CaptureSender::new(config()).unwrap();
        sender.start(device, RecordingUploader::default()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), sender.join_capture())
            .await
            .expect("capture loop should end on device failure");

        assert!(released.load(Ordering::SeqCst));
        assert_eq!(sender.stats().frames_captured, 2);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let mut sender = CaptureSender::new(config()).unwrap();
        sender
            .start(camera(), RecordingUploader::default())
            .unwrap();

        let again = sender.start(camera(), RecordingUploader::default());
        assert!(matches!(again, Err(Error::Config(_))));
        sender.stop();
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(CaptureSender::new(config().queue_capacity(0)).is_err());
    }
}
