//! Statistics for relay cameras and capture senders

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time statistics for one relay camera
#[derive(Debug, Clone, Default)]
pub struct CameraStats {
    /// Frames accepted by ingest
    pub frames_received: u64,
    /// Frames overwritten before any viewer took them
    pub frames_evicted: u64,
    /// Frames handed to viewers
    pub frames_delivered: u64,
    /// Viewers currently streaming this camera
    pub active_viewers: u64,
    /// Size of the most recent frame in bytes
    pub last_frame_bytes: usize,
    /// Frame rate at the last report window
    pub last_fps: Option<f64>,
    /// Time since the camera channel was created
    pub age: Duration,
}

impl CameraStats {
    /// Fraction of received frames that were overwritten unseen
    pub fn eviction_ratio(&self) -> f64 {
        if self.frames_received == 0 {
            0.0
        } else {
            self.frames_evicted as f64 / self.frames_received as f64
        }
    }
}

/// Live counters for one capture sender
#[derive(Debug, Default)]
pub struct SenderStats {
    /// Frames read from the camera
    pub frames_captured: AtomicU64,
    /// Frames placed on the send queue
    pub frames_enqueued: AtomicU64,
    /// Frames discarded because the send queue was full
    pub frames_dropped: AtomicU64,
    /// Frames the relay acknowledged
    pub frames_uploaded: AtomicU64,
    /// Upload attempts that failed
    pub upload_failures: AtomicU64,
    /// Encoded bytes uploaded
    pub bytes_uploaded: AtomicU64,
}

impl SenderStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the counters into a plain snapshot
    pub fn snapshot(&self) -> SenderStatsSnapshot {
        SenderStatsSnapshot {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_enqueued: self.frames_enqueued.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_uploaded: self.frames_uploaded.load(Ordering::Relaxed),
            upload_failures: self.upload_failures.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Plain copy of [`SenderStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStatsSnapshot {
    /// Frames read from the camera
    pub frames_captured: u64,
    /// Frames placed on the send queue
    pub frames_enqueued: u64,
    /// Frames discarded at the send queue
    pub frames_dropped: u64,
    /// Frames the relay acknowledged
    pub frames_uploaded: u64,
    /// Upload attempts that failed
    pub upload_failures: u64,
    /// Encoded bytes uploaded
    pub bytes_uploaded: u64,
}

impl SenderStatsSnapshot {
    /// Upload throughput in bits per second over `elapsed`
    pub fn bitrate(&self, elapsed: Duration) -> u64 {
        let secs = elapsed.as_secs();
        if secs > 0 {
            (self.bytes_uploaded * 8) / secs
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_stats_eviction_ratio() {
        let stats = CameraStats {
            frames_received: 10,
            frames_evicted: 4,
            ..Default::default()
        };
        assert!((stats.eviction_ratio() - 0.4).abs() < 1e-9);

        assert_eq!(CameraStats::default().eviction_ratio(), 0.0);
    }

    #[test]
    fn test_sender_stats_snapshot() {
        let stats = SenderStats::new();
        SenderStats::incr(&stats.frames_captured);
        SenderStats::incr(&stats.frames_captured);
        SenderStats::incr(&stats.frames_dropped);
        stats.bytes_uploaded.fetch_add(1_000_000, Ordering::Relaxed);

        let snap = stats.snapshot();
        assert_eq!(snap.frames_captured, 2);
        assert_eq!(snap.frames_dropped, 1);
        assert_eq!(snap.frames_uploaded, 0);

        // 1,000,000 bytes * 8 bits / 10 seconds = 800,000 bps
        assert_eq!(snap.bitrate(Duration::from_secs(10)), 800_000);
        assert_eq!(snap.bitrate(Duration::ZERO), 0);
    }
}
