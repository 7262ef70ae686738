//! frame-relay: latest-frame MJPEG relay
//!
//! Cameras upload JPEG frames over HTTP; viewers pull a live
//! `multipart/x-mixed-replace` stream. The relay keeps only the newest frame
//! per camera, so a slow viewer never slows down a camera and a stalled
//! camera never closes a viewer's stream.
//!
//! # Server
//!
//! ```no_run
//! use frame_relay::{RelayServer, ServerConfig};
//!
//! # async fn example() -> frame_relay::error::Result<()> {
//! let server = RelayServer::new(ServerConfig::default());
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Sender
//!
//! ```no_run
//! use frame_relay::client::{CaptureSender, HttpUploader, SenderConfig, TestPatternCamera};
//! use frame_relay::relay::CameraId;
//!
//! # async fn example() -> frame_relay::error::Result<()> {
//! let config = SenderConfig::new("http://localhost:5000", CameraId::parse("cam1")?);
//! let uploader = HttpUploader::new(&config.server_url, config.request_timeout)?;
//! let camera = TestPatternCamera::open(0, config.width, config.height)?;
//!
//! let mut sender = CaptureSender::new(config)?;
//! sender.start(camera, uploader)?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod relay;
pub mod server;
pub mod stats;

pub use error::{Error, Result};
pub use relay::{CameraId, CameraRegistry, RelayConfig};
pub use server::{RelayServer, ServerConfig};
