// Export public modules
pub mod common;
pub mod index;
pub mod storage;

// Re-export key items for convenient access
pub use index::btree::BPlusTree;
pub use storage::buffer::BufferPoolError;
pub use storage::buffer::BufferPoolManager;
pub use storage::disk::{DiskManager, FileDiskManager, MemoryDiskManager};
