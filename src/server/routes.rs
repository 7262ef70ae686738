//! HTTP routes
//!
//! `POST /upload/{camera}` stores a frame, `GET /stream/{camera}` serves the
//! live MJPEG stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::relay::{CameraId, CameraRegistry, RelayError};

use super::config::ServerConfig;
use super::stream::{frame_stream, STREAM_CONTENT_TYPE};

/// Name of the multipart field carrying the frame
pub const FRAME_FIELD: &str = "frame";

/// State shared by the route handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CameraRegistry>,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::MissingFrame => {
                (StatusCode::BAD_REQUEST, "No frame in request").into_response()
            }
            RelayError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason).into_response(),
        }
    }
}

/// Build the relay router
pub fn create_router(registry: Arc<CameraRegistry>, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route(
            "/upload/:camera_id",
            post(upload_frame).layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .route("/stream/:camera_id", get(stream_frames))
        .with_state(AppState { registry });

    let router = if config.cors_enabled {
        router.layer(create_cors_layer())
    } else {
        router
    };

    if config.trace_requests {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn upload_frame(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<&'static str, RelayError> {
    let id = CameraId::parse(camera_id)?;

    // A body that is not multipart at all has no frame field either
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(camera = %id, error = %rejection, "Upload without multipart body");
        RelayError::MissingFrame
    })?;

    loop {
        let field = multipart.next_field().await.map_err(|e| {
            tracing::debug!(camera = %id, error = %e, "Malformed multipart upload");
            RelayError::BadRequest(format!("malformed multipart body: {}", e))
        })?;

        let Some(field) = field else {
            return Err(RelayError::MissingFrame);
        };

        if field.name() != Some(FRAME_FIELD) {
            continue;
        }

        let data = field.bytes().await.map_err(|e| {
            tracing::debug!(camera = %id, error = %e, "Failed to read frame field");
            RelayError::BadRequest(format!("failed to read frame: {}", e))
        })?;

        state.registry.ingest(&id, data).await;
        return Ok("OK");
    }
}

async fn stream_frames(
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
) -> Result<Response, RelayError> {
    let id = CameraId::parse(camera_id)?;
    let channel = state.registry.get_or_create(&id).await;

    let stream = frame_stream(
        channel,
        state.registry.config().poll_timeout,
        state.registry.shutdown_signal(),
    )
    .map(Ok::<_, Infallible>);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::PRAGMA, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
