//! Relay HTTP server
//!
//! Binds the listener, serves the routes and ties shutdown of the HTTP server
//! to shutdown of the camera registry.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::error::Result;
use crate::relay::{CameraRegistry, RelayConfig};
use crate::server::config::ServerConfig;
use crate::server::routes::create_router;

/// Frame relay server
pub struct RelayServer {
    config: ServerConfig,
    registry: Arc<CameraRegistry>,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_relay_config(config, RelayConfig::default())
    }

    /// Create a new server with custom relay configuration
    pub fn with_relay_config(config: ServerConfig, relay_config: RelayConfig) -> Self {
        Self {
            config,
            registry: Arc::new(CameraRegistry::with_config(relay_config)),
        }
    }

    /// Get a reference to the camera registry
    pub fn registry(&self) -> &Arc<CameraRegistry> {
        &self.registry
    }

    /// Build the router serving this server's registry
    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.registry), &self.config)
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// On shutdown the registry is shut down as well, which ends every open
    /// viewer stream so that in-flight responses can complete.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Frame relay listening");

        let stats_handle = self.registry.spawn_stats_task();
        let registry = Arc::clone(&self.registry);

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
                registry.shutdown();
            })
            .await;

        // Stop stats task on shutdown
        stats_handle.abort();

        result.map_err(Into::into)
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}
