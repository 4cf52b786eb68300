use thiserror::Error;

use crate::common::types::PageId;
use crate::storage::disk::DiskError;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    #[error("No evictable frame available for page {0}")]
    NoEvictableFrame(PageId),

    #[error("Disk scheduler shut down mid-request for page {0}")]
    SchedulerClosed(PageId),

    #[error("Disk error: {0}")]
    DiskError(#[from] DiskError),
}
