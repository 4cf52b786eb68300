use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use tempfile::NamedTempFile;

use arbordb::storage::buffer::BufferPoolManager;
use arbordb::{FileDiskManager, MemoryDiskManager};

static LOGGER: Lazy<()> = Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

// Create a buffer pool over the in-memory disk manager
#[allow(dead_code)]
pub fn create_memory_buffer_pool(pool_size: usize) -> Arc<BufferPoolManager> {
    Lazy::force(&LOGGER);
    Arc::new(BufferPoolManager::new(
        pool_size,
        Arc::new(MemoryDiskManager::new()),
    ))
}

// Create a buffer pool backed by a temporary database file
#[allow(dead_code)]
pub fn create_file_buffer_pool(
    pool_size: usize,
) -> Result<(Arc<BufferPoolManager>, NamedTempFile)> {
    Lazy::force(&LOGGER);
    let file = NamedTempFile::new()?;
    let disk_manager = Arc::new(FileDiskManager::new(file.path())?);
    Ok((Arc::new(BufferPoolManager::new(pool_size, disk_manager)), file))
}
