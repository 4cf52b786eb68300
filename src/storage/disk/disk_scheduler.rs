use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;

use log::error;
use parking_lot::{Condvar, Mutex};

use crate::common::types::{PageId, PAGE_SIZE};
use crate::storage::disk::disk_manager::DiskManager;

/// Blocking FIFO mailbox: `put` is O(1), `get` blocks until an element is
/// available.
pub(crate) struct Channel<T> {
    queue: Mutex<VecDeque<T>>,
    cond: Condvar,
}

impl<T> Channel<T> {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn put(&self, element: T) {
        let mut queue = self.queue.lock();
        queue.push_back(element);
        drop(queue);
        self.cond.notify_all();
    }

    pub(crate) fn get(&self) -> T {
        let mut queue = self.queue.lock();
        while queue.is_empty() {
            self.cond.wait(&mut queue);
        }
        queue.pop_front().unwrap()
    }
}

/// A single disk I/O request. The ack channel doubles as the completion
/// promise: the issuer blocks on the receiving end until the worker has
/// finished the transfer.
pub enum DiskRequest {
    Read {
        page_id: PageId,
        ack: Sender<Box<[u8]>>,
    },
    Write {
        page_id: PageId,
        data: Box<[u8]>,
        ack: Sender<()>,
    },
}

/// Serializes all disk traffic through one background worker. Requests
/// scheduled by the same thread are serviced in the order they were
/// enqueued.
pub struct DiskScheduler {
    disk_manager: Arc<dyn DiskManager>,
    request_queue: Arc<Channel<Option<DiskRequest>>>,
    background_thread: Option<JoinHandle<()>>,
    scheduled_reads: AtomicU64,
    scheduled_writes: AtomicU64,
}

impl DiskScheduler {
    pub fn new(disk_manager: Arc<dyn DiskManager>) -> Self {
        let request_queue = Arc::new(Channel::new());
        let worker_queue = Arc::clone(&request_queue);
        let worker_dm = Arc::clone(&disk_manager);
        let background_thread = std::thread::spawn(move || {
            Self::worker_loop(worker_queue, worker_dm);
        });
        Self {
            disk_manager,
            request_queue,
            background_thread: Some(background_thread),
            scheduled_reads: AtomicU64::new(0),
            scheduled_writes: AtomicU64::new(0),
        }
    }

    pub fn schedule(&self, request: DiskRequest) {
        match &request {
            DiskRequest::Read { .. } => {
                self.scheduled_reads.fetch_add(1, Ordering::Relaxed);
            }
            DiskRequest::Write { .. } => {
                self.scheduled_writes.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.request_queue.put(Some(request));
    }

    pub fn deallocate_page(&self, page_id: PageId) {
        self.disk_manager.deallocate_page(page_id);
    }

    // Metrics
    pub fn scheduled_reads(&self) -> u64 {
        self.scheduled_reads.load(Ordering::Relaxed)
    }

    pub fn scheduled_writes(&self) -> u64 {
        self.scheduled_writes.load(Ordering::Relaxed)
    }

    fn worker_loop(queue: Arc<Channel<Option<DiskRequest>>>, disk_manager: Arc<dyn DiskManager>) {
        loop {
            let request = match queue.get() {
                Some(request) => request,
                // Sentinel: drain and exit.
                None => return,
            };
            match request {
                DiskRequest::Read { page_id, ack } => {
                    let mut buf = vec![0u8; PAGE_SIZE].into_boxed_slice();
                    match disk_manager.read_page(page_id, &mut buf) {
                        Ok(()) => {
                            // A dropped receiver means the issuer is gone; nothing to do.
                            let _ = ack.send(buf);
                        }
                        Err(e) => {
                            error!("disk read of page {} failed: {}", page_id, e);
                            // Dropping the ack sender signals failure to the issuer.
                        }
                    }
                }
                DiskRequest::Write { page_id, data, ack } => match disk_manager.write_page(page_id, &data) {
                    Ok(()) => {
                        let _ = ack.send(());
                    }
                    Err(e) => {
                        error!("disk write of page {} failed: {}", page_id, e);
                    }
                },
            }
        }
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        self.request_queue.put(None);
        if let Some(handle) = self.background_thread.take() {
            let _ = handle.join();
        }
    }
}
