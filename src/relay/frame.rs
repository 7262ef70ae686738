//! Camera and frame types
//!
//! This module defines the key type identifying a camera and the encoded
//! frames that flow through the relay.

use bytes::Bytes;

use super::error::RelayError;

/// Unique identifier for a camera stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraId(String);

impl CameraId {
    /// Parse a camera id, rejecting empty or blank values
    pub fn parse(raw: impl Into<String>) -> Result<Self, RelayError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(RelayError::BadRequest("empty camera id".into()));
        }
        if raw.chars().any(|c| c.is_control() || c == '/') {
            return Err(RelayError::BadRequest(format!(
                "invalid character in camera id {:?}",
                raw
            )));
        }
        Ok(Self(raw))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CameraId {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// An encoded frame (typically JPEG)
///
/// The relay never looks inside the payload. Cloning is cheap because the
/// bytes are reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Encoded image data
    pub data: Bytes,
    /// Arrival sequence number within the camera channel
    pub sequence: u64,
}

impl Frame {
    /// Create a new frame
    pub fn new(data: Bytes, sequence: u64) -> Self {
        Self { data, sequence }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
