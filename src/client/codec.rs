//! JPEG encoding for captured frames

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbImage};

use crate::error::{Error, Result};

/// JPEG codec with a fixed quality and resize factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JpegCodec {
    quality: u8,
    resize_factor: f32,
}

impl JpegCodec {
    /// Create a codec
    ///
    /// `quality` is clamped to 1..=100. A `resize_factor` of 1.0 keeps the
    /// captured size; 0.5 halves both dimensions.
    pub fn new(quality: u8, resize_factor: f32) -> Result<Self> {
        if !(resize_factor.is_finite() && resize_factor > 0.0) {
            return Err(Error::Config(format!(
                "resize factor must be positive, got {}",
                resize_factor
            )));
        }

        Ok(Self {
            quality: quality.clamp(1, 100),
            resize_factor,
        })
    }

    /// JPEG quality
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Output size for a frame of the given size
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        if self.resize_factor == 1.0 {
            return (width, height);
        }
        let scale = |v: u32| ((v as f32 * self.resize_factor) as u32).max(1);
        (scale(width), scale(height))
    }

    /// Resize (if configured) and encode a frame
    pub fn encode(&self, frame: &RgbImage) -> Result<Bytes> {
        let (width, height) = self.output_size(frame.width(), frame.height());

        let mut jpeg = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, self.quality);
            if (width, height) == frame.dimensions() {
                encoder.encode_image(frame)?;
            } else {
                let resized = imageops::resize(frame, width, height, FilterType::Triangle);
                encoder.encode_image(&resized)?;
            }
        }

        Ok(Bytes::from(jpeg))
    }

    /// Decode a JPEG payload, e.g. for a debug viewer
    pub fn decode(data: &[u8]) -> Result<RgbImage> {
        let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;
        Ok(image.to_rgb8())
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self {
            quality: 70,
            resize_factor: 1.0,
        }
    }
}
