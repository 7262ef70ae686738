//! Frame upload transport
//!
//! The sender's background loop hands each encoded frame to a
//! [`FrameUploader`]. [`HttpUploader`] posts it to the relay as the `frame`
//! field of a multipart form, reusing one connection pool.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Url;

use crate::error::{Error, Result};
use crate::relay::CameraId;
use crate::server::routes::FRAME_FIELD;

/// Delivers encoded frames to the relay
pub trait FrameUploader: Send + Sync + 'static {
    /// Upload one frame for `camera`
    ///
    /// Errors are treated as transient by the caller.
    fn upload(&self, camera: &CameraId, frame: Bytes) -> impl Future<Output = Result<()>> + Send;
}

/// Parse a relay base URL
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)
        .map_err(|e| Error::Config(format!("invalid relay url {}: {}", base_url, e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::Config(format!("relay url {} cannot carry a path", base_url)));
    }
    Ok(url)
}

/// Upload URL for `camera` below `base`
///
/// The camera id is pushed as one percent-encoded path segment, so ids
/// containing `#`, `?` or `%` reach the relay unchanged.
pub(crate) fn upload_url(base: &Url, camera: &CameraId) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::Config(format!("relay url {} cannot carry a path", base)))?
        .pop_if_empty()
        .push("upload")
        .push(camera.as_str());
    Ok(url)
}

/// HTTP multipart uploader
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpUploader {
    /// Create an uploader for the relay at `base_url`
    pub fn new(base_url: impl AsRef<str>, request_timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url.as_ref())?;
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .tcp_nodelay(true)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Upload URL for a camera
    pub fn url_for(&self, camera: &CameraId) -> Result<Url> {
        upload_url(&self.base_url, camera)
    }
}

impl FrameUploader for HttpUploader {
    async fn upload(&self, camera: &CameraId, frame: Bytes) -> Result<()> {
        let part = Part::bytes(frame.to_vec())
            .file_name("frame.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part(FRAME_FIELD, part);

        let response = self
            .client
            .post(self.url_for(camera)?)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upload(format!("relay returned {}: {}", status, body)));
        }

        Ok(())
    }
}
