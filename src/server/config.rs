//! Server configuration

use std::net::SocketAddr;

/// Default port the relay listens on
pub const DEFAULT_PORT: u16 = 5000;

/// Default cap on an upload request body (16 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Largest accepted upload request body in bytes
    pub max_upload_bytes: usize,

    /// Allow cross-origin requests from any origin
    pub cors_enabled: bool,

    /// Log every HTTP request through a trace layer
    pub trace_requests: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cors_enabled: true,
            trace_requests: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the upload body limit
    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Disable CORS headers
    pub fn disable_cors(mut self) -> Self {
        self.cors_enabled = false;
        self
    }

    /// Disable per-request tracing
    pub fn disable_request_tracing(mut self) -> Self {
        self.trace_requests = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 5000);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.cors_enabled);
        assert!(config.trace_requests);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:5001".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 5001);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_upload_bytes(1024)
            .disable_cors()
            .disable_request_tracing();

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_upload_bytes, 1024);
        assert!(!config.cors_enabled);
        assert!(!config.trace_requests);
    }
}
