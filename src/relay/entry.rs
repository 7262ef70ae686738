//! Camera channel state
//!
//! This module defines the per-camera state stored in the registry.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::stats::{CameraStats, RateMonitor};

use super::config::RelayConfig;
use super::frame::{CameraId, Frame};
use super::slot::FrameSlot;

/// Channel for a single camera: its latest-frame slot plus rate tracking
pub struct CameraChannel {
    /// Camera this channel belongs to
    id: CameraId,

    /// Most recent frame, drained by viewers
    slot: FrameSlot,

    /// Ingest frame rate monitor
    monitor: Mutex<RateMonitor>,

    frames_received: AtomicU64,
    frames_evicted: AtomicU64,
    frames_delivered: AtomicU64,
    active_viewers: AtomicU64,
    last_frame_bytes: AtomicUsize,

    /// When the channel was created
    created_at: Instant,
}

impl CameraChannel {
    /// Create a new camera channel
    pub(super) fn new(id: CameraId, config: &RelayConfig) -> Self {
        Self {
            id,
            slot: FrameSlot::new(),
            monitor: Mutex::new(RateMonitor::with_interval(config.report_interval)),
            frames_received: AtomicU64::new(0),
            frames_evicted: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
            active_viewers: AtomicU64::new(0),
            last_frame_bytes: AtomicUsize::new(0),
            created_at: Instant::now(),
        }
    }

    /// Camera id
    pub fn id(&self) -> &CameraId {
        &self.id
    }

    /// The latest-frame slot
    pub fn slot(&self) -> &FrameSlot {
        &self.slot
    }

    /// Store an uploaded frame and update rate tracking
    ///
    /// Never waits on viewers: the previous frame is simply replaced.
    /// Returns the sequence number assigned to the frame.
    pub fn ingest(&self, data: Bytes) -> u64 {
        let size = data.len();

        let (sequence, evicted) = self.slot.publish(data);
        if evicted {
            self.frames_evicted.fetch_add(1, Ordering::Relaxed);
        }
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.last_frame_bytes.store(size, Ordering::Relaxed);

        let mut monitor = self.monitor();
        monitor.record_arrival();
        monitor.maybe_report(self.id.as_str());

        sequence
    }

    /// Wait up to `timeout` for the next frame, removing it from the slot
    pub async fn next_frame(&self, timeout: Duration) -> Option<Frame> {
        let frame = self.slot.take(timeout).await?;
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
        Some(frame)
    }

    /// Register a viewer; the count drops again when the guard is dropped
    pub fn viewer(self: &Arc<Self>) -> ViewerGuard {
        self.active_viewers.fetch_add(1, Ordering::Relaxed);
        ViewerGuard {
            channel: Arc::clone(self),
        }
    }

    /// Number of viewers currently streaming
    pub fn viewer_count(&self) -> u64 {
        self.active_viewers.load(Ordering::Relaxed)
    }

    /// Snapshot of this channel's statistics
    pub fn stats(&self) -> CameraStats {
        CameraStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_evicted: self.frames_evicted.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            active_viewers: self.viewer_count(),
            last_frame_bytes: self.last_frame_bytes.load(Ordering::Relaxed),
            last_fps: self.monitor().last_fps(),
            age: self.created_at.elapsed(),
        }
    }

    fn monitor(&self) -> MutexGuard<'_, RateMonitor> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CameraChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraChannel")
            .field("id", &self.id)
            .field("occupied", &self.slot.is_occupied())
            .field("viewers", &self.viewer_count())
            .finish()
    }
}

/// Keeps a camera's viewer count accurate for the lifetime of a stream
#[derive(Debug)]
pub struct ViewerGuard {
    channel: Arc<CameraChannel>,
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        let prev = self.channel.active_viewers.fetch_sub(1, Ordering::Relaxed);
        tracing::debug!(
            camera = %self.channel.id,
            viewers = prev.saturating_sub(1),
            "Viewer removed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> Arc<CameraChannel> {
        Arc::new(CameraChannel::new(
            CameraId::parse("cam1").unwrap(),
            &RelayConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_ingest_counts_evictions() {
        let channel = channel();

        assert_eq!(channel.ingest(Bytes::from_static(b"AAA")), 0);
        assert_eq!(channel.ingest(Bytes::from_static(b"BBBB")), 1);

        let stats = channel.stats();
        assert_eq!(stats.frames_received, 2);
        assert_eq!(stats.frames_evicted, 1);
        assert_eq!(stats.last_frame_bytes, 4);

        let frame = channel.next_frame(Duration::from_millis(10)).await.unwrap();
        assert_eq!(frame.data, Bytes::from_static(b"BBBB"));
        assert_eq!(frame.sequence, 1);
        assert_eq!(channel.stats().frames_delivered, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingest_sequences_only_increase() {
        let channel = channel();

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let channel = Arc::clone(&channel);
                tokio::spawn(async move {
                    for _ in 0..500 {
                        channel.ingest(Bytes::from_static(b"frame"));
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        let consumer = tokio::spawn({
            let channel = Arc::clone(&channel);
            async move {
                let mut seen = Vec::new();
                while let Some(frame) = channel.next_frame(Duration::from_millis(200)).await {
                    seen.push(frame.sequence);
                }
                seen
            }
        });

        for producer in producers {
            producer.await.unwrap();
        }
        let seen = consumer.await.unwrap();

        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "sequence went backwards");
        assert_eq!(*seen.last().unwrap(), 1999);
    }

    #[test]
    fn test_viewer_guard() {
        let channel = channel();

        let first = channel.viewer();
        let second = channel.viewer();
        assert_eq!(channel.viewer_count(), 2);

        drop(first);
        assert_eq!(channel.viewer_count(), 1);
        drop(second);
        assert_eq!(channel.viewer_count(), 0);
    }
}
