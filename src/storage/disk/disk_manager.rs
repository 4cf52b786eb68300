use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::common::types::{PageId, PAGE_SIZE};

#[derive(Error, Debug)]
pub enum DiskError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Page {0} already allocated")]
    AlreadyAllocated(PageId),
}

/// Page-addressed block store. Reads of a page that was never written
/// auto-allocate it and return zeroed bytes.
pub trait DiskManager: Send + Sync {
    fn read_page(&self, page_id: PageId, out_buf: &mut [u8]) -> Result<(), DiskError>;
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), DiskError>;
    fn allocate_page(&self, page_id: PageId) -> Result<(), DiskError>;
    fn deallocate_page(&self, page_id: PageId);
    fn num_pages(&self) -> usize;
}

/// In-memory disk manager: every page lives in a map. Shared-exclusive
/// latching: many concurrent readers, exclusive writers.
#[derive(Default)]
pub struct MemoryDiskManager {
    pages: RwLock<HashMap<PageId, Box<[u8]>>>,
}

impl MemoryDiskManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn zeroed_page() -> Box<[u8]> {
        vec![0u8; PAGE_SIZE].into_boxed_slice()
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&self, page_id: PageId, out_buf: &mut [u8]) -> Result<(), DiskError> {
        {
            let pages = self.pages.read();
            if let Some(page) = pages.get(&page_id) {
                out_buf.copy_from_slice(page);
                return Ok(());
            }
        }
        // Lazy allocation: first read of an unknown page materializes it.
        let mut pages = self.pages.write();
        let page = pages.entry(page_id).or_insert_with(Self::zeroed_page);
        out_buf.copy_from_slice(page);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), DiskError> {
        let mut pages = self.pages.write();
        let page = pages.entry(page_id).or_insert_with(Self::zeroed_page);
        page.copy_from_slice(buf);
        Ok(())
    }

    fn allocate_page(&self, page_id: PageId) -> Result<(), DiskError> {
        let mut pages = self.pages.write();
        if pages.contains_key(&page_id) {
            return Err(DiskError::AlreadyAllocated(page_id));
        }
        pages.insert(page_id, Self::zeroed_page());
        Ok(())
    }

    fn deallocate_page(&self, page_id: PageId) {
        self.pages.write().remove(&page_id);
    }

    fn num_pages(&self) -> usize {
        self.pages.read().len()
    }
}

/// File-backed disk manager. Pages are stored at `page_id * PAGE_SIZE`;
/// reads past the end of file behave like reads of a fresh page.
pub struct FileDiskManager {
    db_file: Mutex<File>,
}

impl FileDiskManager {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, DiskError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(db_path)?;
        Ok(Self {
            db_file: Mutex::new(file),
        })
    }

    fn page_offset(page_id: PageId) -> u64 {
        page_id as u64 * PAGE_SIZE as u64
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId, out_buf: &mut [u8]) -> Result<(), DiskError> {
        let offset = Self::page_offset(page_id);
        let mut file = self.db_file.lock();
        let file_size = file.metadata()?.len();
        if offset >= file_size {
            out_buf.fill(0);
            return Ok(());
        }
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(out_buf)?;
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), DiskError> {
        let offset = Self::page_offset(page_id);
        let mut file = self.db_file.lock();
        let file_size = file.metadata()?.len();
        if offset > file_size {
            // Extend with zeroed pages so the offset is reachable.
            file.seek(SeekFrom::End(0))?;
            let zeros = [0u8; PAGE_SIZE];
            let mut pos = file_size;
            while pos < offset {
                file.write_all(&zeros)?;
                pos += PAGE_SIZE as u64;
            }
        }
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        file.flush()?;
        Ok(())
    }

    fn allocate_page(&self, _page_id: PageId) -> Result<(), DiskError> {
        // Allocation happens lazily on first write.
        Ok(())
    }

    fn deallocate_page(&self, _page_id: PageId) {
        // File space is not reclaimed.
    }

    fn num_pages(&self) -> usize {
        let file = self.db_file.lock();
        file.metadata().map(|m| m.len() as usize / PAGE_SIZE).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_read_of_unknown_page_is_zeroed() {
        let dm = MemoryDiskManager::new();
        let mut buf = [0xffu8; PAGE_SIZE];
        dm.read_page(7, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
        assert_eq!(dm.num_pages(), 1);
    }

    #[test]
    fn memory_write_then_read_round_trips() {
        let dm = MemoryDiskManager::new();
        let mut data = [0u8; PAGE_SIZE];
        data[0] = 0xab;
        data[PAGE_SIZE - 1] = 0xcd;
        dm.write_page(3, &data).unwrap();

        let mut out = [0u8; PAGE_SIZE];
        dm.read_page(3, &mut out).unwrap();
        assert_eq!(out[0], 0xab);
        assert_eq!(out[PAGE_SIZE - 1], 0xcd);
    }

    #[test]
    fn memory_double_allocate_fails() {
        let dm = MemoryDiskManager::new();
        dm.allocate_page(1).unwrap();
        assert!(dm.allocate_page(1).is_err());
        dm.deallocate_page(1);
        assert!(dm.allocate_page(1).is_ok());
    }
}
