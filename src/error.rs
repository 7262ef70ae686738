//! Error types
//!
//! Crate-wide error type and result alias.

use std::fmt;
use std::io;

use crate::client::camera::DeviceError;
use crate::relay::RelayError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket or filesystem failure
    Io(io::Error),
    /// Relay-side request rejection
    Relay(RelayError),
    /// Frame upload failed (treated as transient by the sender)
    Upload(String),
    /// Camera device failure
    Device(DeviceError),
    /// JPEG encode/decode failure
    Codec(String),
    /// Invalid configuration value
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Relay(e) => write!(f, "Relay error: {}", e),
            Error::Upload(msg) => write!(f, "Upload failed: {}", msg),
            Error::Device(e) => write!(f, "Camera device error: {}", e),
            Error::Codec(msg) => write!(f, "Codec error: {}", msg),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Relay(e) => Some(e),
            Error::Device(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<RelayError> for Error {
    fn from(e: RelayError) -> Self {
        Error::Relay(e)
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Error::Device(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Upload(e.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Codec(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_upload() {
        let err = Error::Upload("connection refused".into());
        assert_eq!(err.to_string(), "Upload failed: connection refused");
    }

    #[test]
    fn test_from_relay_error() {
        let err: Error = RelayError::MissingFrame.into();
        assert!(matches!(err, Error::Relay(RelayError::MissingFrame)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
