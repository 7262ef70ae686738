//! Camera registry implementation
//!
//! The central registry that owns every camera channel and routes uploaded
//! frames to the viewers draining them.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{watch, RwLock};

use crate::stats::CameraStats;

use super::config::RelayConfig;
use super::entry::CameraChannel;
use super::frame::CameraId;

/// Central registry of camera channels
///
/// Channels are created lazily on first reference and live as long as the
/// registry. The map lock is held only for lookup and insertion; frame
/// traffic goes through each channel's own slot.
pub struct CameraRegistry {
    /// Map of camera id to channel
    cameras: RwLock<HashMap<CameraId, Arc<CameraChannel>>>,

    /// Configuration
    config: RelayConfig,

    /// Flips to `true` once on shutdown
    shutdown: watch::Sender<bool>,
}

impl CameraRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RelayConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            cameras: RwLock::new(HashMap::new()),
            config,
            shutdown,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get the channel for a camera, creating it if needed
    ///
    /// Concurrent callers with the same id all receive the same channel.
    pub async fn get_or_create(&self, id: &CameraId) -> Arc<CameraChannel> {
        if let Some(channel) = self.cameras.read().await.get(id) {
            return Arc::clone(channel);
        }

        let mut cameras = self.cameras.write().await;

        // Another caller may have inserted it between the two locks
        let channel = cameras.entry(id.clone()).or_insert_with(|| {
            tracing::info!(camera = %id, "Camera channel created");
            Arc::new(CameraChannel::new(id.clone(), &self.config))
        });

        Arc::clone(channel)
    }

    /// Get the channel for a camera if it exists
    pub async fn get(&self, id: &CameraId) -> Option<Arc<CameraChannel>> {
        self.cameras.read().await.get(id).cloned()
    }

    /// Store an uploaded frame for a camera
    ///
    /// Returns the frame's sequence number within the camera channel.
    pub async fn ingest(&self, id: &CameraId, data: Bytes) -> u64 {
        let channel = self.get_or_create(id).await;
        let sequence = channel.ingest(data);

        tracing::trace!(camera = %id, sequence = sequence, "Frame ingested");
        sequence
    }

    /// Ids of every known camera, sorted
    pub async fn camera_ids(&self) -> Vec<CameraId> {
        let mut ids: Vec<CameraId> = self.cameras.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Get total number of cameras
    pub async fn camera_count(&self) -> usize {
        self.cameras.read().await.len()
    }

    /// Get statistics for one camera
    pub async fn camera_stats(&self, id: &CameraId) -> Option<CameraStats> {
        self.get(id).await.map(|channel| channel.stats())
    }

    /// Signal every open stream to finish
    ///
    /// Channels and their frames stay in place; only streams are ended.
    pub fn shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::info!("Camera registry shutting down");
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Receiver that observes the shutdown flag
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Log statistics for every camera once
    pub async fn log_stats(&self) {
        let channels: Vec<Arc<CameraChannel>> =
            self.cameras.read().await.values().cloned().collect();

        for channel in channels {
            let stats = channel.stats();
            tracing::debug!(
                camera = %channel.id(),
                received = stats.frames_received,
                evicted = stats.frames_evicted,
                delivered = stats.frames_delivered,
                viewers = stats.active_viewers,
                eviction_ratio = (stats.eviction_ratio() * 100.0).round() / 100.0,
                last_fps = ?stats.last_fps,
                "Camera stats"
            );
        }
    }

    /// Spawn background stats logging task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_stats_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.stats_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.log_stats().await;
            }
        })
    }
}

impl Default for CameraRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn cam(id: &str) -> CameraId {
        CameraId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_is_lazy() {
        let registry = CameraRegistry::new();
        assert_eq!(registry.camera_count().await, 0);
        assert!(registry.get(&cam("cam1")).await.is_none());

        let first = registry.get_or_create(&cam("cam1")).await;
        let again = registry.get_or_create(&cam("cam1")).await;
        assert!(Arc::ptr_eq(&first, &again));

        registry.get_or_create(&cam("cam2")).await;
        assert_eq!(registry.camera_count().await, 2);
        assert_eq!(registry.camera_ids().await, vec![cam("cam1"), cam("cam2")]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_get_or_create_single_instance() {
        let registry = Arc::new(CameraRegistry::new());

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.get_or_create(&cam("shared")).await })
            })
            .collect();

        let mut channels = Vec::with_capacity(handles.len());
        for handle in handles {
            channels.push(handle.await.unwrap());
        }

        assert_eq!(registry.camera_count().await, 1);
        assert!(channels.iter().all(|c| Arc::ptr_eq(c, &channels[0])));
    }

    #[tokio::test]
    async fn test_ingest_then_take() {
        let registry = CameraRegistry::new();
        let id = cam("cam1");

        registry.ingest(&id, Bytes::from_static(b"frame")).await;

        let channel = registry.get(&id).await.unwrap();
        let frame = channel.next_frame(Duration::from_millis(10)).await.unwrap();
        assert_eq!(frame.data, Bytes::from_static(b"frame"));

        let stats = registry.camera_stats(&id).await.unwrap();
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.frames_delivered, 1);
    }

    #[tokio::test]
    async fn test_cameras_are_isolated() {
        let registry = CameraRegistry::new();

        registry.ingest(&cam("cam1"), Bytes::from_static(b"one")).await;
        registry.ingest(&cam("cam2"), Bytes::from_static(b"two")).await;

        let cam1 = registry.get(&cam("cam1")).await.unwrap();
        let cam2 = registry.get(&cam("cam2")).await.unwrap();
        assert_eq!(cam1.slot().try_take().unwrap().data, Bytes::from_static(b"one"));
        assert_eq!(cam2.slot().try_take().unwrap().data, Bytes::from_static(b"two"));
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let registry = CameraRegistry::new();
        let mut signal = registry.shutdown_signal();
        assert!(!registry.is_shut_down());

        registry.shutdown();
        registry.shutdown();

        assert!(registry.is_shut_down());
        assert!(signal.wait_for(|done| *done).await.is_ok());
    }
}
