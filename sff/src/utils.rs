//! Byte window helpers shared by the decoders.

/// `min <= value <= max`
pub fn in_range<T: PartialOrd>(value: T, min: T, max: T) -> bool {
    min <= value && value <= max
}

/// Checks that `data[offset..]` starts with `expected`.
pub fn bytes_equal(data: &[u8], offset: usize, expected: &[u8]) -> bool {
    data.get(offset..)
        .is_some_and(|window| window.starts_with(expected))
}

fn window<const N: usize>(data: &[u8], offset: usize) -> Option<[u8; N]> {
    data.get(offset..offset.checked_add(N)?)?.try_into().ok()
}

pub fn le_u32_at(data: &[u8], offset: usize) -> Option<u32> {
    window(data, offset).map(u32::from_le_bytes)
}

pub fn be_u32_at(data: &[u8], offset: usize) -> Option<u32> {
    window(data, offset).map(u32::from_be_bytes)
}

/// `offset + length <= limit` without overflowing.
pub fn range_fits(offset: u32, length: u32, limit: u64) -> bool {
    (offset as u64) + (length as u64) <= limit
}
