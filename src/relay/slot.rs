//! Single-frame overwrite buffer
//!
//! A `FrameSlot` holds at most one frame. Producers overwrite whatever is
//! stored (drop-oldest) and never wait; consumers drain the slot, waiting a
//! bounded amount of time for the next frame to arrive.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Notify;

use super::frame::Frame;

#[derive(Debug, Default)]
struct SlotState {
    frame: Option<Frame>,
    next_sequence: u64,
}

/// Latest-frame buffer for one camera
#[derive(Debug, Default)]
pub struct FrameSlot {
    /// The stored frame; never held across an await point
    state: Mutex<SlotState>,

    /// Signalled whenever a frame is stored
    available: Notify,

    /// Serializes consumers so each frame has exactly one taker
    consumer: tokio::sync::Mutex<()>,
}

impl FrameSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a frame, replacing any frame already present
    ///
    /// Returns `true` if a previous frame was evicted before anyone took it.
    pub fn put(&self, frame: Frame) -> bool {
        let evicted = self.lock().frame.replace(frame).is_some();
        self.available.notify_one();
        evicted
    }

    /// Store `data` under the slot's next sequence number
    ///
    /// The number is assigned under the same lock as the store, so the stored
    /// sequence never goes backwards. Returns the sequence and whether a
    /// previous frame was evicted.
    pub fn publish(&self, data: Bytes) -> (u64, bool) {
        let (sequence, evicted) = {
            let mut state = self.lock();
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            let evicted = state.frame.replace(Frame::new(data, sequence)).is_some();
            (sequence, evicted)
        };
        self.available.notify_one();
        (sequence, evicted)
    }

    /// Take the stored frame without waiting
    pub fn try_take(&self) -> Option<Frame> {
        self.lock().frame.take()
    }

    /// Whether a frame is currently stored
    pub fn is_occupied(&self) -> bool {
        self.lock().frame.is_some()
    }

    /// Wait up to `timeout` for a frame and remove it from the slot
    ///
    /// Returns `None` if nothing arrived in time. A second concurrent caller
    /// waits for the first to return before it starts looking; the timeout
    /// covers that wait too.
    pub async fn take(&self, timeout: Duration) -> Option<Frame> {
        tokio::time::timeout(timeout, self.wait_take()).await.ok()
    }

    async fn wait_take(&self) -> Frame {
        let _consumer = self.consumer.lock().await;

        loop {
            // Register interest before checking so a concurrent put cannot be missed
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(frame) = self.try_take() {
                return frame;
            }

            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
