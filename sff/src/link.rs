use crate::{
    error::{SffError, SffResult},
    types::{PaletteRecord, SpriteRecord},
};

/// Record that may alias another record of the same table.
pub trait Linked {
    fn data_length(&self) -> u32;
    fn link_index(&self) -> u32;
}

impl Linked for SpriteRecord {
    fn data_length(&self) -> u32 {
        self.data_length
    }

    fn link_index(&self) -> u32 {
        self.link_index
    }
}

impl Linked for PaletteRecord {
    fn data_length(&self) -> u32 {
        self.data_length
    }

    fn link_index(&self) -> u32 {
        self.link_index
    }
}

/// Follows zero length records until one with data is found.
///
/// A chain longer than the table itself must revisit a record, which is
/// reported as [`SffError::LinkCycle`].
pub fn resolve<T: Linked>(records: &[T], index: usize) -> SffResult<usize> {
    if index >= records.len() {
        return Err(SffError::IndexOutOfRange { index });
    }

    let mut current = index;

    for _ in 0..records.len() {
        let record = &records[current];

        if record.data_length() != 0 {
            return Ok(current);
        }

        let next = record.link_index() as usize;

        if next >= records.len() {
            return Err(SffError::MalformedDirectoryEntry { index: current });
        }

        current = next;
    }

    Err(SffError::LinkCycle { index })
}
