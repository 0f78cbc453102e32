use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{SffError, SffResult};

/// Random access reader over the sprite file.
///
/// Every read seeks first, so one cursor must not be shared between callers
/// that interleave reads.
pub struct ByteCursor<R> {
    source: Option<R>,
    length: u64,
}

impl<R: Read + Seek> ByteCursor<R> {
    pub fn new(mut source: R) -> SffResult<Self> {
        let length = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        Ok(Self {
            source: Some(source),
            length,
        })
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Reads exactly `length` bytes at `offset`.
    pub fn read(&mut self, offset: u64, length: usize) -> SffResult<Vec<u8>> {
        let source = self.source.as_mut().ok_or(SffError::ResourceClosed)?;

        let end = offset
            .checked_add(length as u64)
            .ok_or(SffError::Truncated)?;

        if end > self.length {
            return Err(SffError::Truncated);
        }

        source.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; length];

        source.read_exact(&mut buffer).map_err(|op| match op.kind() {
            io::ErrorKind::UnexpectedEof => SffError::Truncated,
            _ => SffError::IOError { source: op },
        })?;

        Ok(buffer)
    }

    /// Releases the source. Reads after this fail with [`SffError::ResourceClosed`].
    pub fn close(&mut self) {
        self.source = None;
    }
}
