//! Single-slot store for the latest published frame

use crate::types::Frame;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Holds the most recently published frame.
///
/// Frames are stored behind an `Arc` and swapped wholesale, so a reader
/// either sees the previous frame or the new one, never a mix. Readers
/// clone the `Arc` and release the lock immediately; encoding happens
/// outside the lock.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    slot: RwLock<Option<Arc<Frame>>>,
    published: AtomicU64,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held frame. Empty frames are ignored.
    pub fn publish(&self, frame: Frame) {
        if frame.is_empty() {
            tracing::trace!("Ignoring empty frame");
            return;
        }
        *self.slot.write() = Some(Arc::new(frame));
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// The most recent non-empty frame, if any has been published
    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.slot.read().clone()
    }

    pub fn has_frame(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Number of frames accepted so far
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
