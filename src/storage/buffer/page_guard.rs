use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{Mutex, RawRwLock};

use crate::common::types::PageId;
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::frame::FrameHeader;
use crate::storage::buffer::manager::PoolState;
use crate::storage::buffer::replacer::ArcReplacer;
use crate::storage::disk::{DiskRequest, DiskScheduler};

/// Shared handle to one resident page. Holding the guard pins the frame and
/// keeps its reader latch; dropping it releases the latch and, once the pin
/// count reaches zero, makes the frame evictable again.
pub struct ReadPageGuard {
    page_id: PageId,
    frame: Arc<FrameHeader>,
    data: Option<ArcRwLockReadGuard<RawRwLock, Box<[u8]>>>,
    replacer: Arc<ArcReplacer>,
    bpm_latch: Arc<Mutex<PoolState>>,
    disk_scheduler: Arc<DiskScheduler>,
}

impl ReadPageGuard {
    pub(crate) fn new(
        page_id: PageId,
        frame: Arc<FrameHeader>,
        replacer: Arc<ArcReplacer>,
        bpm_latch: Arc<Mutex<PoolState>>,
        disk_scheduler: Arc<DiskScheduler>,
    ) -> Self {
        {
            let _latch = bpm_latch.lock();
            frame.pin_count.fetch_add(1, Ordering::SeqCst);
            replacer.set_evictable(frame.frame_id, false);
        }
        // The frame latch is taken after the pool latch is released so a
        // long page hold never blocks the pool.
        let data = frame.data.read_arc();
        Self {
            page_id,
            frame,
            data: Some(data),
            replacer,
            bpm_latch,
            disk_scheduler,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref().expect("page guard is valid until dropped")
    }

    pub fn is_dirty(&self) -> bool {
        self.frame.is_dirty()
    }

    /// Synchronously write the frame's current bytes back to disk and clear
    /// the dirty flag.
    pub fn flush(&self) -> Result<(), BufferPoolError> {
        flush_bytes(&self.disk_scheduler, self.page_id, self.data())?;
        self.frame.is_dirty.store(false, Ordering::Release);
        Ok(())
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        // Latch first, pin bookkeeping second; the reverse order of
        // acquisition.
        self.data.take();
        let _latch = self.bpm_latch.lock();
        if self.frame.pin_count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.replacer.set_evictable(self.frame.frame_id, true);
        }
    }
}

/// Exclusive handle to one resident page. Any mutable access marks the
/// frame dirty so it is written back before the frame is reused.
pub struct WritePageGuard {
    page_id: PageId,
    frame: Arc<FrameHeader>,
    data: Option<ArcRwLockWriteGuard<RawRwLock, Box<[u8]>>>,
    replacer: Arc<ArcReplacer>,
    bpm_latch: Arc<Mutex<PoolState>>,
    disk_scheduler: Arc<DiskScheduler>,
}

impl WritePageGuard {
    pub(crate) fn new(
        page_id: PageId,
        frame: Arc<FrameHeader>,
        replacer: Arc<ArcReplacer>,
        bpm_latch: Arc<Mutex<PoolState>>,
        disk_scheduler: Arc<DiskScheduler>,
    ) -> Self {
        {
            let _latch = bpm_latch.lock();
            frame.pin_count.fetch_add(1, Ordering::SeqCst);
            replacer.set_evictable(frame.frame_id, false);
        }
        let data = frame.data.write_arc();
        Self {
            page_id,
            frame,
            data: Some(data),
            replacer,
            bpm_latch,
            disk_scheduler,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref().expect("page guard is valid until dropped")
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.frame.is_dirty.store(true, Ordering::Release);
        self.data.as_mut().expect("page guard is valid until dropped")
    }

    pub fn is_dirty(&self) -> bool {
        self.frame.is_dirty()
    }

    /// Synchronously write the frame's current bytes back to disk and clear
    /// the dirty flag.
    pub fn flush(&self) -> Result<(), BufferPoolError> {
        flush_bytes(&self.disk_scheduler, self.page_id, self.data())?;
        self.frame.is_dirty.store(false, Ordering::Release);
        Ok(())
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        self.data.take();
        let _latch = self.bpm_latch.lock();
        if self.frame.pin_count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.replacer.set_evictable(self.frame.frame_id, true);
        }
    }
}

fn flush_bytes(
    disk_scheduler: &DiskScheduler,
    page_id: PageId,
    data: &[u8],
) -> Result<(), BufferPoolError> {
    let (ack, done) = mpsc::channel();
    disk_scheduler.schedule(DiskRequest::Write {
        page_id,
        data: data.to_vec().into_boxed_slice(),
        ack,
    });
    done.recv()
        .map_err(|_| BufferPoolError::SchedulerClosed(page_id))
}
