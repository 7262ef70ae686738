//! Relay HTTP server
//!
//! Thin axum layer over the camera registry: upload and stream routes, CORS,
//! request tracing and graceful shutdown.

pub mod config;
pub mod listener;
pub mod routes;
pub mod stream;

pub use config::ServerConfig;
pub use listener::RelayServer;
pub use routes::{create_router, AppState};
