use std::marker::PhantomData;
use std::sync::Arc;

use crate::common::types::{PageId, Rid, INVALID_PAGE_ID};
use crate::index::btree::index::base::BPlusTree;
use crate::index::btree::key::IndexKey;
use crate::index::btree::node::{page_is_leaf, InternalPage, LeafPage};
use crate::storage::buffer::BufferPoolManager;

/// Forward iterator over the leaf chain, yielding (key, rid) pairs in key
/// order. Holds no latch between accesses: each step re-acquires a read
/// guard on the current leaf, so the iterator never blocks writers.
pub struct TreeIterator<K: IndexKey> {
    bpm: Arc<BufferPoolManager>,
    page_id: PageId,
    index: usize,
    _key: PhantomData<K>,
}

impl<K: IndexKey> TreeIterator<K> {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, page_id: PageId, index: usize) -> Self {
        Self {
            bpm,
            page_id,
            index,
            _key: PhantomData,
        }
    }

    /// True on the rightmost leaf at the one-past-last slot, or on an
    /// empty tree.
    pub fn is_end(&self) -> bool {
        if self.page_id == INVALID_PAGE_ID {
            return true;
        }
        let guard = self.bpm.read_page(self.page_id);
        let leaf = LeafPage::<_, K>::new(guard.data());
        leaf.next_page_id() == INVALID_PAGE_ID && self.index == leaf.size()
    }
}

impl<K: IndexKey> Iterator for TreeIterator<K> {
    type Item = (K, Rid);

    fn next(&mut self) -> Option<(K, Rid)> {
        while self.page_id != INVALID_PAGE_ID {
            let guard = self.bpm.read_page(self.page_id);
            let leaf = LeafPage::<_, K>::new(guard.data());
            if self.index < leaf.size() {
                let item = (leaf.key_at(self.index), leaf.rid_at(self.index));
                self.index += 1;
                if self.index == leaf.size() && leaf.next_page_id() != INVALID_PAGE_ID {
                    self.page_id = leaf.next_page_id();
                    self.index = 0;
                }
                return Some(item);
            }
            // Positioned past this leaf's pairs (begin_at landed on a
            // boundary): move along the chain.
            if leaf.next_page_id() == INVALID_PAGE_ID {
                return None;
            }
            self.page_id = leaf.next_page_id();
            self.index = 0;
        }
        None
    }
}

impl<K: IndexKey> PartialEq for TreeIterator<K> {
    fn eq(&self, other: &Self) -> bool {
        self.page_id == other.page_id && self.index == other.index
    }
}

impl<K: IndexKey> BPlusTree<K> {
    /// Iterator positioned at the least key.
    pub fn begin(&self) -> TreeIterator<K> {
        let ctx = self.lock_root();
        if ctx.root_page_id == INVALID_PAGE_ID {
            return TreeIterator::new(Arc::clone(&self.bpm), INVALID_PAGE_ID, 0);
        }
        let mut guard = self.bpm.read_page(ctx.root_page_id);
        while !page_is_leaf(guard.data()) {
            let child_id = InternalPage::<_, K>::new(guard.data()).child_at(0);
            guard = self.bpm.read_page(child_id);
        }
        TreeIterator::new(Arc::clone(&self.bpm), guard.page_id(), 0)
    }

    /// Iterator positioned at `key`, or at the next greater key when
    /// absent.
    pub fn begin_at(&self, key: &K) -> TreeIterator<K> {
        let ctx = self.lock_root();
        if ctx.root_page_id == INVALID_PAGE_ID {
            return TreeIterator::new(Arc::clone(&self.bpm), INVALID_PAGE_ID, 0);
        }
        let leaf_guard = self.find_leaf_read(key, ctx.root_page_id);
        let index = LeafPage::<_, K>::new(leaf_guard.data()).key_index(key);
        TreeIterator::new(Arc::clone(&self.bpm), leaf_guard.page_id(), index)
    }

    /// Iterator positioned one past the greatest key.
    pub fn end(&self) -> TreeIterator<K> {
        let ctx = self.lock_root();
        if ctx.root_page_id == INVALID_PAGE_ID {
            return TreeIterator::new(Arc::clone(&self.bpm), INVALID_PAGE_ID, 0);
        }
        let mut guard = self.bpm.read_page(ctx.root_page_id);
        while !page_is_leaf(guard.data()) {
            let child_id = {
                let page = InternalPage::<_, K>::new(guard.data());
                page.child_at(page.size() - 1)
            };
            guard = self.bpm.read_page(child_id);
        }
        let size = LeafPage::<_, K>::new(guard.data()).size();
        TreeIterator::new(Arc::clone(&self.bpm), guard.page_id(), size)
    }
}
