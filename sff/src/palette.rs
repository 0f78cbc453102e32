//! Palette extraction for both sprite file versions.
use crate::{
    error::{SffError, SffResult},
    types::Palette,
};

pub const PCX_HEADER_LENGTH: usize = 128;
/// Marker byte followed by 256 RGB triples.
pub const PCX_PALETTE_TRAILER_LENGTH: usize = 769;
pub const PCX_PALETTE_MARKER: u8 = 0x0C;
pub const PCX_PALETTE_COLORS: usize = 256;

/// Reads the 256 color palette appended to a pcx file.
///
/// Returns `None` when the pcx file does not carry one.
pub fn pcx_trailer_palette(data: &[u8]) -> Option<Palette> {
    if data.len() < PCX_HEADER_LENGTH + PCX_PALETTE_TRAILER_LENGTH {
        return None;
    }

    let trailer = &data[data.len() - PCX_PALETTE_TRAILER_LENGTH..];

    if trailer[0] != PCX_PALETTE_MARKER {
        return None;
    }

    Some(Palette::from_rgb(
        trailer[1..]
            .chunks_exact(3)
            .map(|rgb| [rgb[0], rgb[1], rgb[2]]),
    ))
}

/// Reads `color_count` RGBA entries. The stored alpha is ignored.
pub fn rgbx_palette(data: &[u8], color_count: usize) -> SffResult<Palette> {
    if data.len() < color_count * 4 {
        return Err(SffError::Truncated);
    }

    Ok(Palette::from_rgb(
        data.chunks_exact(4)
            .take(color_count)
            .map(|rgbx| [rgbx[0], rgbx[1], rgbx[2]]),
    ))
}
