//! Capture sender configuration

use std::time::Duration;

use reqwest::Url;

use crate::error::{Error, Result};
use crate::relay::CameraId;

use super::uploader;

/// Capture sender configuration options
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Base URL of the relay, e.g. `http://relay.local:5000`
    pub server_url: String,

    /// Camera id the frames are uploaded under
    pub camera_id: CameraId,

    /// Capture rate in frames per second
    pub target_fps: f64,

    /// JPEG quality (1-100)
    pub quality: u8,

    /// Scale applied before encoding (1.0 = native size)
    pub resize_factor: f32,

    /// Encoded frames waiting for upload; newer frames are dropped when full
    pub queue_capacity: usize,

    /// Pause after a failed upload
    pub retry_backoff: Duration,

    /// Per-request upload timeout
    pub request_timeout: Duration,

    /// Requested capture width
    pub width: u32,

    /// Requested capture height
    pub height: u32,

    /// Interval of the capture frame rate log
    pub stats_interval: Duration,
}

impl SenderConfig {
    /// Create a config with defaults for the given relay and camera
    pub fn new(server_url: impl Into<String>, camera_id: CameraId) -> Self {
        Self {
            server_url: server_url.into(),
            camera_id,
            target_fps: 30.0,
            quality: 70,
            resize_factor: 1.0,
            queue_capacity: 2,
            retry_backoff: Duration::from_millis(100),
            request_timeout: Duration::from_secs(5),
            width: 1280,
            height: 720,
            stats_interval: Duration::from_secs(5),
        }
    }

    /// Set the capture rate
    pub fn target_fps(mut self, fps: f64) -> Self {
        self.target_fps = fps;
        self
    }

    /// Set the JPEG quality
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Set the resize factor
    pub fn resize_factor(mut self, factor: f32) -> Self {
        self.resize_factor = factor;
        self
    }

    /// Set the send queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the retry backoff
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the upload request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the requested capture resolution
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Time between captured frames
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps)
    }

    /// Full upload URL for this camera
    pub fn upload_url(&self) -> Result<Url> {
        let base = uploader::parse_base_url(&self.server_url)?;
        uploader::upload_url(&base, &self.camera_id)
    }

    /// Check that all values are usable
    pub fn validate(&self) -> Result<()> {
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(Error::Config(format!(
                "target fps must be positive, got {}",
                self.target_fps
            )));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue capacity must be at least 1".into()));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(Error::Config(format!(
                "quality must be 1-100, got {}",
                self.quality
            )));
        }
        if !(self.resize_factor.is_finite() && self.resize_factor > 0.0) {
            return Err(Error::Config(format!(
                "resize factor must be positive, got {}",
                self.resize_factor
            )));
        }
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "server url must start with http:// or https://, got {}",
                self.server_url
            )));
        }
        self.upload_url()?;
        Ok(())
    }
}
