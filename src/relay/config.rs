//! Relay configuration

use std::time::Duration;

use crate::stats::rate::DEFAULT_REPORT_INTERVAL;

/// Configuration for the camera registry and its streams
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How long a stream waits for a frame before emitting a keep-alive
    pub poll_timeout: Duration,

    /// Window over which each camera's ingest frame rate is reported
    pub report_interval: Duration,

    /// Interval of the background per-camera stats log
    pub stats_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
            report_interval: DEFAULT_REPORT_INTERVAL,
            stats_interval: Duration::from_secs(30),
        }
    }
}

impl RelayConfig {
    /// Set the stream poll timeout
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the frame rate report window
    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Set the stats log interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }
}
