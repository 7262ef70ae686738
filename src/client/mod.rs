//! Capture side of the relay
//!
//! Reads frames from a local camera at a target rate, encodes them as JPEG
//! and uploads them to the relay from a background loop.

pub mod camera;
pub mod codec;
pub mod config;
pub mod sender;
pub mod uploader;

pub use camera::{CameraDevice, DeviceError, TestPatternCamera};
pub use codec::JpegCodec;
pub use config::SenderConfig;
pub use sender::CaptureSender;
pub use uploader::{FrameUploader, HttpUploader};
