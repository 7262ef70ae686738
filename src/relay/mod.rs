//! Latest-frame relay
//!
//! The registry holds one channel per camera. Each channel keeps only the most
//! recent uploaded frame in a [`FrameSlot`]; viewers drain that slot.
//!
//! # Architecture
//!
//! ```text
//!                         Arc<CameraRegistry>
//!                    ┌───────────────────────────┐
//!                    │ cameras: HashMap<Id,      │
//!                    │   CameraChannel {         │
//!                    │     slot: FrameSlot,      │
//!                    │     monitor: RateMonitor, │
//!                    │   }                       │
//!                    │ >                         │
//!                    └─────────────┬─────────────┘
//!                                  │
//!          ┌───────────────────────┼───────────────────────┐
//!          │                       │                       │
//!          ▼                       ▼                       ▼
//!   POST /upload/{id}       GET /stream/{id}        GET /stream/{id}
//!   slot.put(frame)         slot.take(1s)           slot.take(1s)
//!   (drop-oldest)           (one winner per frame)
//! ```
//!
//! # Multiple viewers
//!
//! `take` removes the frame, so viewers of the same camera compete: each
//! sees a subset of the frames. This is fine for the usual one-viewer setup.

pub mod config;
pub mod entry;
pub mod error;
pub mod frame;
pub mod slot;
pub mod store;

pub use config::RelayConfig;
pub use entry::{CameraChannel, ViewerGuard};
pub use error::RelayError;
pub use frame::{CameraId, Frame};
pub use slot::FrameSlot;
pub use store::CameraRegistry;
