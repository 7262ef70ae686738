//! Frame rate monitoring and counters

pub mod metrics;
pub mod rate;

pub use metrics::{CameraStats, SenderStats, SenderStatsSnapshot};
pub use rate::{FrameRateWindow, RateMonitor};
