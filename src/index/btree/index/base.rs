use std::collections::VecDeque;
use std::fmt::Write as _;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::common::types::{PageId, INVALID_PAGE_ID};
use crate::index::btree::key::IndexKey;
use crate::index::btree::node::{
    internal_slot_capacity, leaf_slot_capacity, page_is_leaf, HeaderPage, InternalPage, LeafPage,
};
use crate::storage::buffer::{BufferPoolManager, ReadPageGuard, WritePageGuard};

/// Unique-key B+ tree over the buffer pool. Internal pages route the
/// search; leaf pages hold (key, rid) pairs and chain left to right.
///
/// Every operation first write-latches the header page, so structure
/// modifications serialize against each other and against readers taking
/// their root snapshot.
pub struct BPlusTree<K: IndexKey> {
    pub(crate) bpm: Arc<BufferPoolManager>,
    pub(crate) header_page_id: PageId,
    pub(crate) leaf_max_size: usize,
    pub(crate) internal_max_size: usize,
    pub(crate) _key: PhantomData<K>,
}

/// Latches held during one tree operation: the header page guard, the root
/// snapshot taken under it, and the write-latched descent path.
pub(crate) struct Context {
    pub(crate) header_page: WritePageGuard,
    pub(crate) root_page_id: PageId,
    pub(crate) write_set: VecDeque<WritePageGuard>,
}

impl Context {
    pub(crate) fn is_root_page(&self, page_id: PageId) -> bool {
        page_id == self.root_page_id
    }

    /// Point the tree at a new root, updating the header page in place.
    pub(crate) fn set_root(&mut self, page_id: PageId) {
        self.root_page_id = page_id;
        HeaderPage::new(self.header_page.data_mut()).set_root_page_id(page_id);
    }
}

impl<K: IndexKey> BPlusTree<K> {
    /// Create a tree whose header lives at `header_page_id`, with explicit
    /// fanout bounds (useful for forcing splits in tests).
    pub fn new(
        bpm: Arc<BufferPoolManager>,
        header_page_id: PageId,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Self {
        {
            let mut guard = bpm.write_page(header_page_id);
            HeaderPage::new(guard.data_mut()).set_root_page_id(INVALID_PAGE_ID);
        }
        Self {
            bpm,
            header_page_id,
            leaf_max_size,
            internal_max_size,
            _key: PhantomData,
        }
    }

    /// Create a tree with the largest fanout the page size allows.
    pub fn with_default_sizes(bpm: Arc<BufferPoolManager>, header_page_id: PageId) -> Self {
        let leaf_max_size = leaf_slot_capacity::<K>();
        let internal_max_size = internal_slot_capacity::<K>();
        Self::new(bpm, header_page_id, leaf_max_size, internal_max_size)
    }

    pub fn is_empty(&self) -> bool {
        self.root_page_id() == INVALID_PAGE_ID
    }

    pub fn root_page_id(&self) -> PageId {
        HeaderPage::new(self.bpm.read_page(self.header_page_id).data()).root_page_id()
    }

    /// Write-latch the header and snapshot the root, pinning the tree's
    /// shape for the duration of the operation.
    pub(crate) fn lock_root(&self) -> Context {
        let header_page = self.bpm.write_page(self.header_page_id);
        let root_page_id = HeaderPage::new(header_page.data()).root_page_id();
        Context {
            header_page,
            root_page_id,
            write_set: VecDeque::new(),
        }
    }

    /// Read-latched descent: each child is latched before the parent's
    /// latch is dropped.
    pub(crate) fn find_leaf_read(&self, key: &K, root_page_id: PageId) -> ReadPageGuard {
        let mut guard = self.bpm.read_page(root_page_id);
        while !page_is_leaf(guard.data()) {
            let child_id = {
                let page = InternalPage::<_, K>::new(guard.data());
                page.child_at(page.child_index(key))
            };
            guard = self.bpm.read_page(child_id);
        }
        guard
    }

    /// Write-latched descent: the whole path is retained in
    /// `ctx.write_set`, leaf last.
    pub(crate) fn find_path_write(&self, key: &K, ctx: &mut Context) {
        let mut guard = self.bpm.write_page(ctx.root_page_id);
        while !page_is_leaf(guard.data()) {
            let child_id = {
                let page = InternalPage::<_, K>::new(guard.data());
                page.child_at(page.child_index(key))
            };
            ctx.write_set.push_back(guard);
            guard = self.bpm.write_page(child_id);
        }
        ctx.write_set.push_back(guard);
    }

    /// Level-order rendering of the tree structure: page ids and keys, one
    /// line per level.
    pub fn dump(&self) -> String {
        let root_page_id = self.root_page_id();
        if root_page_id == INVALID_PAGE_ID {
            return "(empty tree)".to_string();
        }
        let mut out = String::new();
        let mut level = vec![root_page_id];
        while !level.is_empty() {
            let mut next_level = Vec::new();
            for &page_id in &level {
                let guard = self.bpm.read_page(page_id);
                if page_is_leaf(guard.data()) {
                    let leaf = LeafPage::<_, K>::new(guard.data());
                    let keys: Vec<K> = (0..leaf.size()).map(|i| leaf.key_at(i)).collect();
                    let _ = write!(out, "leaf {} {:?}  ", page_id, keys);
                } else {
                    let page = InternalPage::<_, K>::new(guard.data());
                    let keys: Vec<K> = (1..page.size()).map(|i| page.key_at(i)).collect();
                    let _ = write!(out, "node {} {:?}  ", page_id, keys);
                    for i in 0..page.size() {
                        next_level.push(page.child_at(i));
                    }
                }
            }
            out.push('\n');
            level = next_level;
        }
        out
    }
}
