use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;

use crate::common::types::{FrameId, PageId};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::frame::FrameHeader;
use crate::storage::buffer::page_guard::{ReadPageGuard, WritePageGuard};
use crate::storage::buffer::replacer::ArcReplacer;
use crate::storage::disk::{DiskManager, DiskRequest, DiskScheduler};

/// State protected by the pool latch: which frame holds which page, and
/// which frames hold nothing at all. Their key sets are disjoint and
/// together cover every frame.
pub(crate) struct PoolState {
    pub(crate) page_table: HashMap<PageId, FrameId>,
    pub(crate) free_list: VecDeque<FrameId>,
}

/// Fixed-capacity cache of disk pages. All page access goes through
/// [`ReadPageGuard`]/[`WritePageGuard`] handles obtained here; the pool
/// faults pages in on demand and evicts cold frames through the ARC
/// replacer when no free frame remains.
pub struct BufferPoolManager {
    num_frames: usize,
    next_page_id: AtomicI32,
    latch: Arc<Mutex<PoolState>>,
    frames: Vec<Arc<FrameHeader>>,
    replacer: Arc<ArcReplacer>,
    disk_scheduler: Arc<DiskScheduler>,

    // Simple metrics
    disk_reads: AtomicU64,
    disk_writes: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl BufferPoolManager {
    pub fn new(num_frames: usize, disk_manager: Arc<dyn DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(num_frames);
        let mut free_list = VecDeque::with_capacity(num_frames);
        for i in 0..num_frames {
            frames.push(Arc::new(FrameHeader::new(i as FrameId)));
            free_list.push_back(i as FrameId);
        }
        Self {
            num_frames,
            next_page_id: AtomicI32::new(0),
            latch: Arc::new(Mutex::new(PoolState {
                page_table: HashMap::with_capacity(num_frames),
                free_list,
            })),
            frames,
            replacer: Arc::new(ArcReplacer::new(num_frames)),
            disk_scheduler: Arc::new(DiskScheduler::new(disk_manager)),
            disk_reads: AtomicU64::new(0),
            disk_writes: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    /// Pool capacity in frames.
    pub fn size(&self) -> usize {
        self.num_frames
    }

    /// Hand out a fresh page id. No frame is faulted in; the page
    /// materializes on first access.
    pub fn new_page(&self) -> PageId {
        self.next_page_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Acquire an exclusive guard on a page, faulting it in if necessary.
    ///
    /// # Panics
    ///
    /// Panics if the page id is out of range or no frame can be freed;
    /// both are fatal (see [`Self::checked_write_page`]).
    pub fn write_page(&self, page_id: PageId) -> WritePageGuard {
        self.checked_write_page(page_id)
            .unwrap_or_else(|e| panic!("failed to bring in page {}: {}", page_id, e))
    }

    /// Acquire a shared guard on a page, faulting it in if necessary.
    ///
    /// # Panics
    ///
    /// Panics if the page id is out of range or no frame can be freed;
    /// both are fatal (see [`Self::checked_read_page`]).
    pub fn read_page(&self, page_id: PageId) -> ReadPageGuard {
        self.checked_read_page(page_id)
            .unwrap_or_else(|e| panic!("failed to bring in page {}: {}", page_id, e))
    }

    pub fn checked_write_page(&self, page_id: PageId) -> Result<WritePageGuard, BufferPoolError> {
        let frame = self.fault_in(page_id)?;
        self.replacer.record_access(frame.frame_id, page_id);
        Ok(WritePageGuard::new(
            page_id,
            frame,
            Arc::clone(&self.replacer),
            Arc::clone(&self.latch),
            Arc::clone(&self.disk_scheduler),
        ))
    }

    pub fn checked_read_page(&self, page_id: PageId) -> Result<ReadPageGuard, BufferPoolError> {
        let frame = self.fault_in(page_id)?;
        self.replacer.record_access(frame.frame_id, page_id);
        Ok(ReadPageGuard::new(
            page_id,
            frame,
            Arc::clone(&self.replacer),
            Arc::clone(&self.latch),
            Arc::clone(&self.disk_scheduler),
        ))
    }

    /// If the page is resident, write it back when dirty and return true;
    /// false when the id is out of range or the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> bool {
        let state = self.latch.lock();
        if page_id < 0 || page_id >= self.next_page_id.load(Ordering::SeqCst) {
            return false;
        }
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id as usize];
        if let Err(e) = self.flush_frame(page_id, frame) {
            panic!("failed to flush page {}: {}", page_id, e);
        }
        true
    }

    /// Write back every resident dirty page.
    pub fn flush_all_pages(&self) {
        let state = self.latch.lock();
        for (&page_id, &frame_id) in state.page_table.iter() {
            let frame = &self.frames[frame_id as usize];
            if let Err(e) = self.flush_frame(page_id, frame) {
                panic!("failed to flush page {}: {}", page_id, e);
            }
        }
    }

    /// Pin count of a resident page; `None` when not resident or out of
    /// range.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<usize> {
        let state = self.latch.lock();
        if page_id < 0 || page_id >= self.next_page_id.load(Ordering::SeqCst) {
            return None;
        }
        let &frame_id = state.page_table.get(&page_id)?;
        Some(self.frames[frame_id as usize].pin_count())
    }

    /// Drop a page from the pool and the backing store. Fails (false) when
    /// the id is out of range or the page is pinned.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut state = self.latch.lock();
        if page_id < 0 || page_id >= self.next_page_id.load(Ordering::SeqCst) {
            return false;
        }
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id as usize];
            if frame.pin_count() > 0 {
                return false;
            }
            state.page_table.remove(&page_id);
            self.replacer.remove(frame_id);
            frame.reset();
            state.free_list.push_back(frame_id);
        }
        self.disk_scheduler.deallocate_page(page_id);
        true
    }

    // Metrics getters
    pub fn disk_reads(&self) -> u64 {
        self.disk_reads.load(Ordering::Relaxed)
    }

    pub fn disk_writes(&self) -> u64 {
        self.disk_writes.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Map a page id to a frame, faulting the page in from disk when it is
    /// not resident. Runs under the pool latch; the returned frame is
    /// handed to a guard constructor after the latch is released.
    fn fault_in(&self, page_id: PageId) -> Result<Arc<FrameHeader>, BufferPoolError> {
        let mut state = self.latch.lock();
        if page_id < 0 || page_id >= self.next_page_id.load(Ordering::SeqCst) {
            return Err(BufferPoolError::InvalidPageId(page_id));
        }

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(&self.frames[frame_id as usize]));
        }

        let frame_id = if let Some(frame_id) = state.free_list.pop_front() {
            frame_id
        } else {
            let Some(victim_id) = self.replacer.evict() else {
                warn!("no evictable frame while faulting in page {}", page_id);
                return Err(BufferPoolError::NoEvictableFrame(page_id));
            };
            // Reverse lookup: which page currently occupies the victim?
            let old_mapping = state
                .page_table
                .iter()
                .find(|(_, &f)| f == victim_id)
                .map(|(&p, _)| p);
            if let Some(old_page_id) = old_mapping {
                self.flush_frame(old_page_id, &self.frames[victim_id as usize])?;
                state.page_table.remove(&old_page_id);
            }
            victim_id
        };

        let frame = &self.frames[frame_id as usize];
        frame.reset();
        self.fetch_from_disk(page_id, frame)?;
        state.page_table.insert(page_id, frame_id);
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::clone(frame))
    }

    /// Read a page's bytes from disk into the frame, blocking on the
    /// scheduler's completion.
    fn fetch_from_disk(&self, page_id: PageId, frame: &FrameHeader) -> Result<(), BufferPoolError> {
        let (ack, done) = mpsc::channel();
        self.disk_scheduler.schedule(DiskRequest::Read { page_id, ack });
        self.disk_reads.fetch_add(1, Ordering::Relaxed);
        let buf = done
            .recv()
            .map_err(|_| BufferPoolError::SchedulerClosed(page_id))?;
        frame.data.write().copy_from_slice(&buf);
        Ok(())
    }

    /// Write a frame's bytes back to disk if dirty, blocking on the
    /// scheduler's completion, and clear the dirty flag. The frame's latch
    /// is held shared across the write so the flushed image is consistent.
    fn flush_frame(&self, page_id: PageId, frame: &FrameHeader) -> Result<(), BufferPoolError> {
        let data_guard = frame.data.read();
        if !frame.is_dirty() {
            return Ok(());
        }
        let (ack, done) = mpsc::channel();
        self.disk_scheduler.schedule(DiskRequest::Write {
            page_id,
            data: data_guard.clone(),
            ack,
        });
        self.disk_writes.fetch_add(1, Ordering::Relaxed);
        done.recv()
            .map_err(|_| BufferPoolError::SchedulerClosed(page_id))?;
        frame.is_dirty.store(false, Ordering::Release);
        Ok(())
    }
}
