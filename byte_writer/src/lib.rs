//! Little endian byte buffer builder.
//!
//! Used to lay out sprite files and their embedded images byte by byte.

pub struct ByteWriter {
    pub data: Vec<u8>,
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Current length, which is also the offset of the next appended byte.
    pub fn get_offset(&self) -> usize {
        self.data.len()
    }

    pub fn append_u8(&mut self, i: u8) {
        self.data.push(i);
    }

    pub fn append_u16(&mut self, i: u16) {
        self.data.extend(i.to_le_bytes());
    }

    pub fn append_i16(&mut self, i: i16) {
        self.data.extend(i.to_le_bytes());
    }

    pub fn append_u32(&mut self, i: u32) {
        self.data.extend(i.to_le_bytes());
    }

    pub fn append_u8_slice(&mut self, i: &[u8]) {
        self.data.extend_from_slice(i);
    }

    pub fn append_zeroes(&mut self, count: usize) {
        self.data.resize(self.data.len() + count, 0);
    }

    /// Zero fills up to `offset`. Does nothing if the buffer is already that long.
    pub fn pad_to(&mut self, offset: usize) {
        if offset > self.data.len() {
            self.data.resize(offset, 0);
        }
    }

    pub fn replace(&mut self, start: usize, slice: &[u8]) {
        self.data[start..(start + slice.len())].copy_from_slice(slice);
    }

    pub fn replace_with_u32(&mut self, start: usize, val: u32) {
        self.replace(start, &val.to_le_bytes());
    }
}
