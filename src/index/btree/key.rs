use byteorder::{ByteOrder, LittleEndian};

/// A fixed-size, totally ordered key that can be packed into a page.
/// Encoding is little-endian, matching the on-page layout.
pub trait IndexKey: Copy + Ord + std::fmt::Debug + Send + Sync + 'static {
    /// Encoded size in bytes.
    const SIZE: usize;

    fn write_to(&self, buf: &mut [u8]);
    fn read_from(buf: &[u8]) -> Self;
}

impl IndexKey for i32 {
    const SIZE: usize = 4;

    fn write_to(&self, buf: &mut [u8]) {
        LittleEndian::write_i32(buf, *self);
    }

    fn read_from(buf: &[u8]) -> Self {
        LittleEndian::read_i32(buf)
    }
}

impl IndexKey for i64 {
    const SIZE: usize = 8;

    fn write_to(&self, buf: &mut [u8]) {
        LittleEndian::write_i64(buf, *self);
    }

    fn read_from(buf: &[u8]) -> Self {
        LittleEndian::read_i64(buf)
    }
}
