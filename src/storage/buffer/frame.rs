use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::types::{FrameId, PAGE_SIZE};

/// One buffer pool slot: a page-sized byte buffer plus the bookkeeping the
/// pool needs to decide when the slot can be reused. The RW latch around the
/// bytes is what page guards acquire; pin count and dirty flag live outside
/// it so the pool can inspect them without contending with guard holders.
pub struct FrameHeader {
    pub(crate) frame_id: FrameId,
    pub(crate) pin_count: AtomicUsize,
    pub(crate) is_dirty: AtomicBool,
    pub(crate) data: Arc<RwLock<Box<[u8]>>>,
}

impl FrameHeader {
    pub(crate) fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            pin_count: AtomicUsize::new(0),
            is_dirty: AtomicBool::new(false),
            data: Arc::new(RwLock::new(vec![0u8; PAGE_SIZE].into_boxed_slice())),
        }
    }

    /// Zero the buffer and clear all bookkeeping. Only called by the pool
    /// while it holds the pool latch and no guard references the frame.
    pub(crate) fn reset(&self) {
        self.data.write().fill(0);
        self.pin_count.store(0, Ordering::Release);
        self.is_dirty.store(false, Ordering::Release);
    }

    pub(crate) fn pin_count(&self) -> usize {
        self.pin_count.load(Ordering::Acquire)
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }
}
