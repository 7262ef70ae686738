//! Relay error types
//!
//! Client-facing errors for ingest and stream requests.

/// Error type for relay operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Camera id was empty or otherwise malformed
    BadRequest(String),
    /// Ingest request carried no `frame` field
    MissingFrame,
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::BadRequest(reason) => write!(f, "Bad request: {}", reason),
            RelayError::MissingFrame => write!(f, "No frame in request"),
        }
    }
}

impl std::error::Error for RelayError {}
