use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::PageId;

/// The tree's header page: a single root pointer at offset 0. The rest of
/// the page is unused.
pub struct HeaderPage<B> {
    buf: B,
}

impl<B: AsRef<[u8]>> HeaderPage<B> {
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    pub fn root_page_id(&self) -> PageId {
        LittleEndian::read_i32(self.buf.as_ref())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> HeaderPage<B> {
    pub fn set_root_page_id(&mut self, page_id: PageId) {
        LittleEndian::write_i32(self.buf.as_mut(), page_id);
    }
}
