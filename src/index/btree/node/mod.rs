pub mod base;
pub mod header;
pub mod internal;
pub mod leaf;

pub use base::{page_is_leaf, INTERNAL_PAGE, LEAF_PAGE};
pub use header::HeaderPage;
pub use internal::{internal_slot_capacity, InternalPage};
pub use leaf::{leaf_slot_capacity, LeafPage};
