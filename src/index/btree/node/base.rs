//! Shared header layout for B+ tree pages.
//!
//! Every tree page starts with a 12-byte header, little-endian:
//!
//! ```text
//! ---------------------------------------------------------
//! | PageType (4) | CurrentSize (4) | MaxSize (4) |  ...   |
//! ---------------------------------------------------------
//! ```

use byteorder::{ByteOrder, LittleEndian};

pub const LEAF_PAGE: i32 = 1;
pub const INTERNAL_PAGE: i32 = 2;

pub(crate) const PAGE_TYPE_OFFSET: usize = 0;
pub(crate) const SIZE_OFFSET: usize = 4;
pub(crate) const MAX_SIZE_OFFSET: usize = 8;
pub(crate) const COMMON_HEADER_SIZE: usize = 12;

pub fn page_is_leaf(data: &[u8]) -> bool {
    LittleEndian::read_i32(&data[PAGE_TYPE_OFFSET..]) == LEAF_PAGE
}

pub(crate) fn read_size(data: &[u8]) -> usize {
    LittleEndian::read_i32(&data[SIZE_OFFSET..]) as usize
}

pub(crate) fn write_size(data: &mut [u8], size: usize) {
    LittleEndian::write_i32(&mut data[SIZE_OFFSET..], size as i32);
}

pub(crate) fn read_max_size(data: &[u8]) -> usize {
    LittleEndian::read_i32(&data[MAX_SIZE_OFFSET..]) as usize
}

pub(crate) fn write_header(data: &mut [u8], page_type: i32, max_size: usize) {
    LittleEndian::write_i32(&mut data[PAGE_TYPE_OFFSET..], page_type);
    LittleEndian::write_i32(&mut data[SIZE_OFFSET..], 0);
    LittleEndian::write_i32(&mut data[MAX_SIZE_OFFSET..], max_size as i32);
}

/// Lower occupancy bound for non-root pages.
pub(crate) fn min_size_for(max_size: usize) -> usize {
    (max_size + 1) / 2
}
