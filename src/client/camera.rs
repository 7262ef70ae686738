//! Camera device abstraction
//!
//! Capture code talks to cameras through [`CameraDevice`]. The crate ships a
//! synthetic [`TestPatternCamera`] so senders can run without hardware.

use image::{Rgb, RgbImage};

/// Camera failure; fatal to the capture loop that owns the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device could not be opened
    OpenFailed(String),
    /// The device stopped delivering frames (unplugged, driver error)
    Disconnected(String),
    /// The device was used after release
    Released,
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::OpenFailed(msg) => write!(f, "Failed to open camera: {}", msg),
            DeviceError::Disconnected(msg) => write!(f, "Camera disconnected: {}", msg),
            DeviceError::Released => write!(f, "Camera already released"),
        }
    }
}

impl std::error::Error for DeviceError {}

/// A source of raw frames
///
/// `read` may block for up to one frame period; the sender calls it off the
/// async runtime.
pub trait CameraDevice: Send + 'static {
    /// Read the next frame; `Ok(None)` means no frame is ready yet
    fn read(&mut self) -> Result<Option<RgbImage>, DeviceError>;

    /// Release the device. Further reads fail with [`DeviceError::Released`].
    fn release(&mut self);

    /// Nominal frame size
    fn resolution(&self) -> (u32, u32);
}

/// Synthetic camera producing a moving gradient
#[derive(Debug)]
pub struct TestPatternCamera {
    device_index: u32,
    width: u32,
    height: u32,
    frame_index: u64,
    fail_after: Option<u64>,
    released: bool,
}

impl TestPatternCamera {
    /// Open a test pattern source at the requested resolution
    pub fn open(device_index: u32, width: u32, height: u32) -> Result<Self, DeviceError> {
        if width == 0 || height == 0 {
            return Err(DeviceError::OpenFailed(format!(
                "invalid resolution {}x{}",
                width, height
            )));
        }

        tracing::debug!(
            device = device_index,
            width = width,
            height = height,
            "Opened test pattern camera"
        );

        Ok(Self {
            device_index,
            width,
            height,
            frame_index: 0,
            fail_after: None,
            released: false,
        })
    }

    /// Simulate a disconnect after `frames` successful reads
    pub fn fail_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Frames produced so far
    pub fn frames_read(&self) -> u64 {
        self.frame_index
    }

    /// Whether `release` has been called
    pub fn is_released(&self) -> bool {
        self.released
    }

    fn render(&self) -> RgbImage {
        let offset = (self.frame_index * 4) as u32 + self.device_index * 64;
        RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb([
                ((x + offset) % 256) as u8,
                ((y + offset / 2) % 256) as u8,
                (offset % 256) as u8,
            ])
        })
    }
}

impl CameraDevice for TestPatternCamera {
    fn read(&mut self) -> Result<Option<RgbImage>, DeviceError> {
        if self.released {
            return Err(DeviceError::Released);
        }
        if self.fail_after.is_some_and(|limit| self.frame_index >= limit) {
            return Err(DeviceError::Disconnected(format!(
                "test pattern device {} unplugged",
                self.device_index
            )));
        }

        let frame = self.render();
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            tracing::debug!(device = self.device_index, "Released test pattern camera");
        }
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
