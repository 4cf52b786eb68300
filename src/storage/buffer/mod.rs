pub mod error;
pub mod frame;
pub mod manager;
pub mod page_guard;
pub mod replacer;

pub use error::BufferPoolError;
pub use manager::BufferPoolManager;
pub use page_guard::{ReadPageGuard, WritePageGuard};
pub use replacer::ArcReplacer;
