//! Leaf page layout.
//!
//! ```text
//!  -----------------------------------------------------------------
//! | PageType (4) | CurrentSize (4) | MaxSize (4) | NextPageId (4)  |
//!  -----------------------------------------------------------------
//! | KEY(0) | KEY(1) | ... | KEY(max_size-1)                        |
//!  -----------------------------------------------------------------
//! | RID(0) | RID(1) | ... | RID(max_size-1)                        |
//!  -----------------------------------------------------------------
//! ```
//!
//! Keys are packed at fixed stride, values likewise; `next_page_id` chains
//! leaves left to right in key order.

use std::marker::PhantomData;

use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::{PageId, Rid, INVALID_PAGE_ID, PAGE_SIZE};
use crate::index::btree::key::IndexKey;
use crate::index::btree::node::base;

pub(crate) const NEXT_PAGE_ID_OFFSET: usize = base::COMMON_HEADER_SIZE;
pub(crate) const LEAF_HEADER_SIZE: usize = base::COMMON_HEADER_SIZE + 4;
const RID_SIZE: usize = 8;

/// Greatest number of (key, rid) slots that fit on one page.
pub fn leaf_slot_capacity<K: IndexKey>() -> usize {
    (PAGE_SIZE - LEAF_HEADER_SIZE) / (K::SIZE + RID_SIZE)
}

/// Typed view over a leaf page's bytes.
pub struct LeafPage<B, K> {
    buf: B,
    _key: PhantomData<K>,
}

impl<B: AsRef<[u8]>, K: IndexKey> LeafPage<B, K> {
    pub fn new(buf: B) -> Self {
        Self {
            buf,
            _key: PhantomData,
        }
    }

    pub fn size(&self) -> usize {
        base::read_size(self.buf.as_ref())
    }

    pub fn max_size(&self) -> usize {
        base::read_max_size(self.buf.as_ref())
    }

    pub fn min_size(&self) -> usize {
        base::min_size_for(self.max_size())
    }

    pub fn next_page_id(&self) -> PageId {
        LittleEndian::read_i32(&self.buf.as_ref()[NEXT_PAGE_ID_OFFSET..])
    }

    pub fn key_at(&self, index: usize) -> K {
        let offset = LEAF_HEADER_SIZE + index * K::SIZE;
        K::read_from(&self.buf.as_ref()[offset..offset + K::SIZE])
    }

    pub fn rid_at(&self, index: usize) -> Rid {
        let offset = self.rid_offset(index);
        let data = self.buf.as_ref();
        Rid::new(
            LittleEndian::read_i32(&data[offset..]),
            LittleEndian::read_i32(&data[offset + 4..]),
        )
    }

    /// Binary search for `key`: the index of the matching slot, or the
    /// insertion point when absent.
    pub fn key_index(&self, key: &K) -> usize {
        let mut lo = 0;
        let mut hi = self.size();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match key.cmp(&self.key_at(mid)) {
                std::cmp::Ordering::Equal => return mid,
                std::cmp::Ordering::Less => hi = mid,
                std::cmp::Ordering::Greater => lo = mid + 1,
            }
        }
        lo
    }

    fn rid_offset(&self, index: usize) -> usize {
        LEAF_HEADER_SIZE + self.max_size() * K::SIZE + index * RID_SIZE
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>, K: IndexKey> LeafPage<B, K> {
    pub fn init(&mut self, max_size: usize) {
        base::write_header(self.buf.as_mut(), base::LEAF_PAGE, max_size);
        self.set_next_page_id(INVALID_PAGE_ID);
    }

    pub fn set_size(&mut self, size: usize) {
        base::write_size(self.buf.as_mut(), size);
    }

    pub fn set_next_page_id(&mut self, next_page_id: PageId) {
        LittleEndian::write_i32(&mut self.buf.as_mut()[NEXT_PAGE_ID_OFFSET..], next_page_id);
    }

    pub fn set_key_at(&mut self, index: usize, key: K) {
        let offset = LEAF_HEADER_SIZE + index * K::SIZE;
        key.write_to(&mut self.buf.as_mut()[offset..offset + K::SIZE]);
    }

    pub fn set_rid_at(&mut self, index: usize, rid: Rid) {
        let offset = self.rid_offset(index);
        let data = self.buf.as_mut();
        LittleEndian::write_i32(&mut data[offset..], rid.page_id);
        LittleEndian::write_i32(&mut data[offset + 4..], rid.slot_num);
    }

    /// Shift slots `[index, size)` one to the right and place the pair at
    /// `index`. The caller checks capacity.
    pub fn insert_at(&mut self, index: usize, key: K, rid: Rid) {
        for i in (index..self.size()).rev() {
            self.set_key_at(i + 1, self.key_at(i));
            self.set_rid_at(i + 1, self.rid_at(i));
        }
        self.set_key_at(index, key);
        self.set_rid_at(index, rid);
        let new_size = self.size() + 1;
        self.set_size(new_size);
    }

    /// Remove the pair at `index`, shifting the tail left.
    pub fn remove_at(&mut self, index: usize) {
        for i in index..self.size() - 1 {
            self.set_key_at(i, self.key_at(i + 1));
            self.set_rid_at(i, self.rid_at(i + 1));
        }
        let new_size = self.size() - 1;
        self.set_size(new_size);
    }
}
