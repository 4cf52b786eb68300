use log::debug;

use crate::common::types::{PageId, Rid, INVALID_PAGE_ID};
use crate::index::btree::index::base::BPlusTree;
use crate::index::btree::key::IndexKey;
use crate::index::btree::node::{InternalPage, LeafPage};
use crate::storage::buffer::WritePageGuard;

impl<K: IndexKey> BPlusTree<K> {
    /// Look up the rid stored under `key`.
    pub fn get_value(&self, key: &K) -> Option<Rid> {
        let ctx = self.lock_root();
        if ctx.root_page_id == INVALID_PAGE_ID {
            return None;
        }
        let leaf_guard = self.find_leaf_read(key, ctx.root_page_id);
        let leaf = LeafPage::<_, K>::new(leaf_guard.data());
        let index = leaf.key_index(key);
        if index < leaf.size() && leaf.key_at(index) == *key {
            Some(leaf.rid_at(index))
        } else {
            None
        }
    }

    /// Insert a (key, rid) pair. Returns false when the key already
    /// exists; keys are unique.
    pub fn insert(&self, key: K, rid: Rid) -> bool {
        let mut ctx = self.lock_root();
        if ctx.root_page_id == INVALID_PAGE_ID {
            let root_id = self.bpm.new_page();
            ctx.set_root(root_id);
            let mut root_guard = self.bpm.write_page(root_id);
            let mut leaf = LeafPage::<_, K>::new(root_guard.data_mut());
            leaf.init(self.leaf_max_size);
            leaf.insert_at(0, key, rid);
            debug!("created root leaf page {}", root_id);
            return true;
        }

        self.find_path_write(&key, &mut ctx);
        let mut leaf_guard = ctx.write_set.pop_back().expect("descent reaches a leaf");

        let (index, at_capacity) = {
            let leaf = LeafPage::<_, K>::new(leaf_guard.data());
            let index = leaf.key_index(&key);
            if index < leaf.size() && leaf.key_at(index) == key {
                return false;
            }
            (index, leaf.size() >= leaf.max_size())
        };

        // Split first when full, then insert into whichever half owns the
        // slot.
        let mut up: Option<(K, PageId)> = None;
        if at_capacity {
            up = Some(self.split_leaf(&mut leaf_guard, index, key, rid));
        } else {
            let mut leaf = LeafPage::<_, K>::new(leaf_guard.data_mut());
            leaf.insert_at(index, key, rid);
        }
        let mut left_child_id = leaf_guard.page_id();
        drop(leaf_guard);

        // Propagate the split upward, growing a new root when it reaches
        // the top.
        while let Some((up_key, new_child_id)) = up {
            let mut parent_guard = match ctx.write_set.pop_back() {
                Some(guard) => guard,
                None => {
                    let new_root_id = self.bpm.new_page();
                    ctx.set_root(new_root_id);
                    let mut root_guard = self.bpm.write_page(new_root_id);
                    {
                        let mut root = InternalPage::<_, K>::new(root_guard.data_mut());
                        root.init(self.internal_max_size);
                        root.set_child_at(0, left_child_id);
                        root.set_size(1);
                    }
                    debug!("created root internal page {}", new_root_id);
                    root_guard
                }
            };
            left_child_id = parent_guard.page_id();
            up = self.insert_into_internal(&mut parent_guard, up_key, new_child_id);
        }
        true
    }

    /// Split a full leaf around its midpoint and insert the new pair into
    /// the half that owns `index`. Returns the separator to push up and
    /// the new right sibling's id.
    fn split_leaf(
        &self,
        leaf_guard: &mut WritePageGuard,
        index: usize,
        key: K,
        rid: Rid,
    ) -> (K, PageId) {
        let new_leaf_id = self.bpm.new_page();
        let mut new_leaf_guard = self.bpm.write_page(new_leaf_id);

        let (min_size, moved, old_next) = {
            let leaf = LeafPage::<_, K>::new(leaf_guard.data());
            let min_size = leaf.min_size();
            let moved: Vec<(K, Rid)> = (min_size..leaf.size())
                .map(|i| (leaf.key_at(i), leaf.rid_at(i)))
                .collect();
            (min_size, moved, leaf.next_page_id())
        };
        {
            let mut new_leaf = LeafPage::<_, K>::new(new_leaf_guard.data_mut());
            new_leaf.init(self.leaf_max_size);
            for (i, &(k, v)) in moved.iter().enumerate() {
                new_leaf.set_key_at(i, k);
                new_leaf.set_rid_at(i, v);
            }
            new_leaf.set_size(moved.len());
            new_leaf.set_next_page_id(old_next);
        }
        {
            let mut leaf = LeafPage::<_, K>::new(leaf_guard.data_mut());
            leaf.set_size(min_size);
            leaf.set_next_page_id(new_leaf_id);
        }

        if index >= min_size {
            let mut new_leaf = LeafPage::<_, K>::new(new_leaf_guard.data_mut());
            new_leaf.insert_at(index - min_size, key, rid);
        } else {
            let mut leaf = LeafPage::<_, K>::new(leaf_guard.data_mut());
            leaf.insert_at(index, key, rid);
        }

        let up_key = LeafPage::<_, K>::new(new_leaf_guard.data()).key_at(0);
        (up_key, new_leaf_id)
    }

    /// Insert a separator and child pointer into an internal page,
    /// splitting it when full. Returns the next (separator, page) pair to
    /// propagate, or `None` once absorbed.
    fn insert_into_internal(
        &self,
        parent_guard: &mut WritePageGuard,
        up_key: K,
        new_child_id: PageId,
    ) -> Option<(K, PageId)> {
        let (size, index) = {
            let parent = InternalPage::<_, K>::new(parent_guard.data());
            (parent.size(), parent.key_index(&up_key))
        };
        if size < self.internal_max_size {
            let mut parent = InternalPage::<_, K>::new(parent_guard.data_mut());
            parent.insert_at(index, up_key, new_child_id);
            return None;
        }

        // Full: split around the occupancy midpoint. Which half receives
        // the new separator, and which key gets promoted, depends on where
        // the insertion point falls relative to the midpoint.
        let new_internal_id = self.bpm.new_page();
        let mut new_internal_guard = self.bpm.write_page(new_internal_id);
        {
            let mut new_internal = InternalPage::<_, K>::new(new_internal_guard.data_mut());
            new_internal.init(self.internal_max_size);
        }

        let mut mid = {
            let parent = InternalPage::<_, K>::new(parent_guard.data());
            parent.min_size()
        };

        let promoted;
        if index == mid {
            // The new separator itself is promoted; the new child leads
            // the right half.
            let moved: Vec<(K, PageId)> = {
                let parent = InternalPage::<_, K>::new(parent_guard.data());
                (mid..size)
                    .map(|i| (parent.key_at(i), parent.child_at(i)))
                    .collect()
            };
            {
                let mut parent = InternalPage::<_, K>::new(parent_guard.data_mut());
                parent.set_size(mid);
            }
            {
                let mut new_internal = InternalPage::<_, K>::new(new_internal_guard.data_mut());
                new_internal.set_child_at(0, new_child_id);
                new_internal.set_size(1);
                for &(k, c) in &moved {
                    let at = new_internal.size();
                    new_internal.insert_at(at, k, c);
                }
            }
            promoted = up_key;
        } else if index < mid {
            // Promote the key left of the midpoint and insert into the
            // left half, which now has room.
            mid -= 1;
            let (tmp, first_child, moved) = {
                let parent = InternalPage::<_, K>::new(parent_guard.data());
                let moved: Vec<(K, PageId)> = (mid + 1..size)
                    .map(|i| (parent.key_at(i), parent.child_at(i)))
                    .collect();
                (parent.key_at(mid), parent.child_at(mid), moved)
            };
            {
                let mut new_internal = InternalPage::<_, K>::new(new_internal_guard.data_mut());
                new_internal.set_child_at(0, first_child);
                new_internal.set_size(1);
                for &(k, c) in &moved {
                    let at = new_internal.size();
                    new_internal.insert_at(at, k, c);
                }
            }
            {
                let mut parent = InternalPage::<_, K>::new(parent_guard.data_mut());
                parent.set_size(mid);
                parent.insert_at(index, up_key, new_child_id);
            }
            promoted = tmp;
        } else {
            // index > mid: promote the midpoint key and insert into the
            // right half at its ordered position.
            let (tmp, first_child, before, after) = {
                let parent = InternalPage::<_, K>::new(parent_guard.data());
                let before: Vec<(K, PageId)> = (mid + 1..index)
                    .map(|i| (parent.key_at(i), parent.child_at(i)))
                    .collect();
                let after: Vec<(K, PageId)> = (index..size)
                    .map(|i| (parent.key_at(i), parent.child_at(i)))
                    .collect();
                (parent.key_at(mid), parent.child_at(mid), before, after)
            };
            {
                let mut new_internal = InternalPage::<_, K>::new(new_internal_guard.data_mut());
                new_internal.set_child_at(0, first_child);
                new_internal.set_size(1);
                for &(k, c) in before.iter() {
                    let at = new_internal.size();
                    new_internal.insert_at(at, k, c);
                }
                let at = new_internal.size();
                new_internal.insert_at(at, up_key, new_child_id);
                for &(k, c) in after.iter() {
                    let at = new_internal.size();
                    new_internal.insert_at(at, k, c);
                }
            }
            {
                let mut parent = InternalPage::<_, K>::new(parent_guard.data_mut());
                parent.set_size(mid);
            }
            promoted = tmp;
        }

        Some((promoted, new_internal_id))
    }
}
