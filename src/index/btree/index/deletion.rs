use log::debug;

use crate::common::types::INVALID_PAGE_ID;
use crate::index::btree::index::base::BPlusTree;
use crate::index::btree::key::IndexKey;
use crate::index::btree::node::{InternalPage, LeafPage};
use crate::storage::buffer::WritePageGuard;

impl<K: IndexKey> BPlusTree<K> {
    /// Remove `key` and its rid. Absent keys are ignored.
    pub fn remove(&self, key: &K) {
        let mut ctx = self.lock_root();
        if ctx.root_page_id == INVALID_PAGE_ID {
            return;
        }
        self.find_path_write(key, &mut ctx);
        let mut leaf_guard = ctx.write_set.pop_back().expect("descent reaches a leaf");

        let index = {
            let leaf = LeafPage::<_, K>::new(leaf_guard.data());
            let index = leaf.key_index(key);
            if index >= leaf.size() || leaf.key_at(index) != *key {
                return;
            }
            index
        };
        {
            let mut leaf = LeafPage::<_, K>::new(leaf_guard.data_mut());
            leaf.remove_at(index);
        }

        let (leaf_size, leaf_min) = {
            let leaf = LeafPage::<_, K>::new(leaf_guard.data());
            (leaf.size(), leaf.min_size())
        };
        if ctx.is_root_page(leaf_guard.page_id()) {
            if leaf_size == 0 {
                ctx.set_root(INVALID_PAGE_ID);
                debug!("last key removed, root cleared");
            }
            return;
        }
        if leaf_size >= leaf_min {
            return;
        }

        // Underflow: rebalance bottom-up. Redistribution ends the walk;
        // a merge removes a separator from the parent and may cascade.
        let mut child_guard = leaf_guard;
        let mut child_is_leaf = true;
        loop {
            let mut parent_guard = ctx
                .write_set
                .pop_back()
                .expect("non-root page has a parent on the path");
            let parent_index = InternalPage::<_, K>::new(parent_guard.data())
                .value_index(child_guard.page_id())
                .expect("child pointer present in its parent");

            let merged = if child_is_leaf {
                self.rebalance_leaf(&mut parent_guard, child_guard, parent_index)
            } else {
                self.rebalance_internal(&mut parent_guard, child_guard, parent_index)
            };
            if !merged {
                return;
            }

            let parent_size = InternalPage::<_, K>::new(parent_guard.data()).size();
            if ctx.is_root_page(parent_guard.page_id()) {
                if parent_size == 1 {
                    let sole_child =
                        InternalPage::<_, K>::new(parent_guard.data()).child_at(0);
                    ctx.set_root(sole_child);
                    debug!("root collapsed into page {}", sole_child);
                }
                return;
            }
            let parent_min = InternalPage::<_, K>::new(parent_guard.data()).min_size();
            if parent_size >= parent_min {
                return;
            }
            child_guard = parent_guard;
            child_is_leaf = false;
        }
    }

    /// Fix an underfull leaf at `parent_index`. Tries to borrow from the
    /// left sibling, then the right; merges otherwise (into the left when
    /// one exists). Returns true iff a merge removed a separator from the
    /// parent.
    fn rebalance_leaf(
        &self,
        parent_guard: &mut WritePageGuard,
        mut child_guard: WritePageGuard,
        parent_index: usize,
    ) -> bool {
        let parent_size = InternalPage::<_, K>::new(parent_guard.data()).size();

        if parent_index > 0 {
            let left_id =
                InternalPage::<_, K>::new(parent_guard.data()).child_at(parent_index - 1);
            let mut left_guard = self.bpm.write_page(left_id);
            let (left_size, left_min) = {
                let left = LeafPage::<_, K>::new(left_guard.data());
                (left.size(), left.min_size())
            };
            if left_size > left_min {
                // Borrow the left sibling's greatest pair.
                let (borrowed_key, borrowed_rid) = {
                    let left = LeafPage::<_, K>::new(left_guard.data());
                    (left.key_at(left_size - 1), left.rid_at(left_size - 1))
                };
                LeafPage::<_, K>::new(left_guard.data_mut()).set_size(left_size - 1);
                LeafPage::<_, K>::new(child_guard.data_mut()).insert_at(0, borrowed_key, borrowed_rid);
                InternalPage::<_, K>::new(parent_guard.data_mut())
                    .set_key_at(parent_index, borrowed_key);
                return false;
            }
        }

        if parent_index + 1 < parent_size {
            let right_id =
                InternalPage::<_, K>::new(parent_guard.data()).child_at(parent_index + 1);
            let mut right_guard = self.bpm.write_page(right_id);
            let (right_size, right_min) = {
                let right = LeafPage::<_, K>::new(right_guard.data());
                (right.size(), right.min_size())
            };
            if right_size > right_min {
                // Borrow the right sibling's least pair.
                let (borrowed_key, borrowed_rid) = {
                    let right = LeafPage::<_, K>::new(right_guard.data());
                    (right.key_at(0), right.rid_at(0))
                };
                {
                    let mut right = LeafPage::<_, K>::new(right_guard.data_mut());
                    right.remove_at(0);
                }
                {
                    let mut child = LeafPage::<_, K>::new(child_guard.data_mut());
                    let at = child.size();
                    child.insert_at(at, borrowed_key, borrowed_rid);
                }
                let new_separator = LeafPage::<_, K>::new(right_guard.data()).key_at(0);
                InternalPage::<_, K>::new(parent_guard.data_mut())
                    .set_key_at(parent_index + 1, new_separator);
                return false;
            }
        }

        // Merge. Prefer absorbing into the left sibling.
        if parent_index > 0 {
            let left_id =
                InternalPage::<_, K>::new(parent_guard.data()).child_at(parent_index - 1);
            let mut left_guard = self.bpm.write_page(left_id);
            self.merge_leaves(&mut left_guard, &mut child_guard);
            InternalPage::<_, K>::new(parent_guard.data_mut()).remove_at(parent_index);
        } else {
            let right_id =
                InternalPage::<_, K>::new(parent_guard.data()).child_at(parent_index + 1);
            let mut right_guard = self.bpm.write_page(right_id);
            self.merge_leaves(&mut child_guard, &mut right_guard);
            InternalPage::<_, K>::new(parent_guard.data_mut()).remove_at(parent_index + 1);
        }
        true
    }

    /// Append `right`'s pairs onto `left` and splice `right` out of the
    /// leaf chain.
    fn merge_leaves(&self, left_guard: &mut WritePageGuard, right_guard: &mut WritePageGuard) {
        let (moved, right_next) = {
            let right = LeafPage::<_, K>::new(right_guard.data());
            let moved: Vec<_> = (0..right.size())
                .map(|i| (right.key_at(i), right.rid_at(i)))
                .collect();
            (moved, right.next_page_id())
        };
        let mut left = LeafPage::<_, K>::new(left_guard.data_mut());
        for &(k, v) in &moved {
            let at = left.size();
            left.set_key_at(at, k);
            left.set_rid_at(at, v);
            left.set_size(at + 1);
        }
        left.set_next_page_id(right_next);
        {
            let mut right = LeafPage::<_, K>::new(right_guard.data_mut());
            right.set_size(0);
        }
    }

    /// Fix an underfull internal page: rotate a (separator, child) pair in
    /// from a sibling, or merge through the separator. Returns true iff a
    /// merge removed a separator from the parent.
    fn rebalance_internal(
        &self,
        parent_guard: &mut WritePageGuard,
        mut child_guard: WritePageGuard,
        parent_index: usize,
    ) -> bool {
        let parent_size = InternalPage::<_, K>::new(parent_guard.data()).size();

        if parent_index > 0 {
            let left_id =
                InternalPage::<_, K>::new(parent_guard.data()).child_at(parent_index - 1);
            let mut left_guard = self.bpm.write_page(left_id);
            let (left_size, left_min) = {
                let left = InternalPage::<_, K>::new(left_guard.data());
                (left.size(), left.min_size())
            };
            if left_size > left_min {
                // Rotate right through the separator: the parent's key
                // drops into the child, the left sibling's last key rises.
                let (left_last_key, left_last_child) = {
                    let left = InternalPage::<_, K>::new(left_guard.data());
                    (left.key_at(left_size - 1), left.child_at(left_size - 1))
                };
                let separator =
                    InternalPage::<_, K>::new(parent_guard.data()).key_at(parent_index);
                {
                    let mut child = InternalPage::<_, K>::new(child_guard.data_mut());
                    let child_size = child.size();
                    for i in (1..child_size).rev() {
                        child.set_key_at(i + 1, child.key_at(i));
                    }
                    for i in (0..child_size).rev() {
                        child.set_child_at(i + 1, child.child_at(i));
                    }
                    child.set_key_at(1, separator);
                    child.set_child_at(0, left_last_child);
                    child.set_size(child_size + 1);
                }
                InternalPage::<_, K>::new(parent_guard.data_mut())
                    .set_key_at(parent_index, left_last_key);
                InternalPage::<_, K>::new(left_guard.data_mut()).set_size(left_size - 1);
                return false;
            }
        }

        if parent_index + 1 < parent_size {
            let right_id =
                InternalPage::<_, K>::new(parent_guard.data()).child_at(parent_index + 1);
            let mut right_guard = self.bpm.write_page(right_id);
            let (right_size, right_min) = {
                let right = InternalPage::<_, K>::new(right_guard.data());
                (right.size(), right.min_size())
            };
            if right_size > right_min {
                // Rotate left through the separator.
                let separator =
                    InternalPage::<_, K>::new(parent_guard.data()).key_at(parent_index + 1);
                let (right_first_child, right_second_key) = {
                    let right = InternalPage::<_, K>::new(right_guard.data());
                    (right.child_at(0), right.key_at(1))
                };
                {
                    let mut child = InternalPage::<_, K>::new(child_guard.data_mut());
                    let child_size = child.size();
                    child.set_key_at(child_size, separator);
                    child.set_child_at(child_size, right_first_child);
                    child.set_size(child_size + 1);
                }
                InternalPage::<_, K>::new(parent_guard.data_mut())
                    .set_key_at(parent_index + 1, right_second_key);
                {
                    let mut right = InternalPage::<_, K>::new(right_guard.data_mut());
                    for i in 1..right_size - 1 {
                        right.set_key_at(i, right.key_at(i + 1));
                    }
                    for i in 0..right_size - 1 {
                        right.set_child_at(i, right.child_at(i + 1));
                    }
                    right.set_size(right_size - 1);
                }
                return false;
            }
        }

        // Merge through the separator; prefer the left sibling.
        if parent_index > 0 {
            let left_id =
                InternalPage::<_, K>::new(parent_guard.data()).child_at(parent_index - 1);
            let mut left_guard = self.bpm.write_page(left_id);
            let separator = InternalPage::<_, K>::new(parent_guard.data()).key_at(parent_index);
            self.merge_internals(&mut left_guard, &mut child_guard, separator);
            InternalPage::<_, K>::new(parent_guard.data_mut()).remove_at(parent_index);
        } else {
            let right_id =
                InternalPage::<_, K>::new(parent_guard.data()).child_at(parent_index + 1);
            let mut right_guard = self.bpm.write_page(right_id);
            let separator =
                InternalPage::<_, K>::new(parent_guard.data()).key_at(parent_index + 1);
            self.merge_internals(&mut child_guard, &mut right_guard, separator);
            InternalPage::<_, K>::new(parent_guard.data_mut()).remove_at(parent_index + 1);
        }
        true
    }

    /// Pull the separator down into `left`, then append all of `right`'s
    /// slots.
    fn merge_internals(
        &self,
        left_guard: &mut WritePageGuard,
        right_guard: &mut WritePageGuard,
        separator: K,
    ) {
        let (right_first_child, moved) = {
            let right = InternalPage::<_, K>::new(right_guard.data());
            let moved: Vec<_> = (1..right.size())
                .map(|i| (right.key_at(i), right.child_at(i)))
                .collect();
            (right.child_at(0), moved)
        };
        {
            let mut left = InternalPage::<_, K>::new(left_guard.data_mut());
            let at = left.size();
            left.set_key_at(at, separator);
            left.set_child_at(at, right_first_child);
            left.set_size(at + 1);
            for &(k, c) in &moved {
                let at = left.size();
                left.set_key_at(at, k);
                left.set_child_at(at, c);
                left.set_size(at + 1);
            }
        }
        {
            let mut right = InternalPage::<_, K>::new(right_guard.data_mut());
            right.set_size(0);
        }
    }
}
