/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Page ID type
pub type PageId = i32;

/// Buffer pool frame ID type
pub type FrameId = i32;

/// Sentinel meaning "no page"
pub const INVALID_PAGE_ID: PageId = -1;

/// Sentinel meaning "no frame"
pub const INVALID_FRAME_ID: FrameId = -1;

/// Record ID: the location of a row as (page, slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    pub page_id: PageId,
    pub slot_num: i32,
}

impl Rid {
    pub fn new(page_id: PageId, slot_num: i32) -> Self {
        Self { page_id, slot_num }
    }

    pub fn is_valid(&self) -> bool {
        self.page_id != INVALID_PAGE_ID && self.slot_num >= 0
    }
}

impl Default for Rid {
    fn default() -> Self {
        Self {
            page_id: INVALID_PAGE_ID,
            slot_num: -1,
        }
    }
}
