//! MJPEG viewer stream
//!
//! Each viewer gets an endless sequence of `multipart/x-mixed-replace` parts,
//! one per frame drained from its camera's slot. When no frame shows up within
//! the poll timeout an empty keep-alive chunk is produced instead, so producer
//! silence never ends the stream. The stream ends when it is dropped (viewer
//! disconnected) or when the registry shuts down.

use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::{self, Stream};
use tokio::sync::watch;

use crate::relay::{CameraChannel, Frame, ViewerGuard};

/// Multipart boundary separating frames
pub const BOUNDARY: &str = "frame";

/// Content type of a viewer stream response
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const PART_HEADERS: &[u8] = b"\r\nContent-Type: image/jpeg\r\n\r\n";

/// Frame one JPEG as a multipart part
pub fn encode_part(frame: &Frame) -> Bytes {
    let mut buf =
        BytesMut::with_capacity(2 + BOUNDARY.len() + PART_HEADERS.len() + frame.len() + 2);
    buf.put_slice(b"--");
    buf.put_slice(BOUNDARY.as_bytes());
    buf.put_slice(PART_HEADERS);
    buf.put_slice(&frame.data);
    buf.put_slice(b"\r\n");
    buf.freeze()
}

struct ViewerState {
    channel: Arc<CameraChannel>,
    shutdown: watch::Receiver<bool>,
    poll_timeout: Duration,
    _viewer: ViewerGuard,
}

/// Build the chunk stream for one viewer of `channel`
///
/// Yields an encoded part per frame and an empty chunk per idle poll.
pub fn frame_stream(
    channel: Arc<CameraChannel>,
    poll_timeout: Duration,
    shutdown: watch::Receiver<bool>,
) -> impl Stream<Item = Bytes> + Send + 'static {
    let viewer = channel.viewer();
    tracing::debug!(
        camera = %channel.id(),
        viewers = channel.viewer_count(),
        "Viewer added"
    );

    let state = ViewerState {
        channel,
        shutdown,
        poll_timeout,
        _viewer: viewer,
    };

    stream::unfold(state, |mut state| async move {
        if *state.shutdown.borrow() {
            return None;
        }

        let chunk = tokio::select! {
            frame = state.channel.next_frame(state.poll_timeout) => match frame {
                Some(frame) => encode_part(&frame),
                None => Bytes::new(),
            },
            _ = state.shutdown.wait_for(|done| *done) => {
                tracing::debug!(camera = %state.channel.id(), "Stream closed by shutdown");
                return None;
            }
        };

        Some((chunk, state))
    })
}
