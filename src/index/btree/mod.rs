pub mod index;
pub mod key;
pub mod node;

pub use index::{BPlusTree, TreeIterator};
pub use key::IndexKey;
