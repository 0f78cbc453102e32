//! Png backed images of the 2.1 revision.
//!
//! Data is a normal png file prefixed with its uncompressed size as `u32`.
use std::ops::Range;

use image::{ImageFormat, RgbaImage};

use crate::{
    error::{SffError, SffResult},
    types::Palette,
    utils::{be_u32_at, bytes_equal},
};

const PNG_SIZE_PREFIX_LENGTH: usize = 4;
const PNG_SIGNATURE_LENGTH: usize = 8;
/// length + type + crc
const PNG_CHUNK_OVERHEAD: usize = 12;
const PNG_MAX_PALETTE_COLORS: usize = 256;
const PLTE: &[u8; 4] = b"PLTE";

/// Decoder for the png files stored inside sprite files.
pub trait PngCodec {
    fn decode_png(&self, data: &[u8]) -> image::ImageResult<RgbaImage>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImagePngCodec;

impl PngCodec for ImagePngCodec {
    fn decode_png(&self, data: &[u8]) -> image::ImageResult<RgbaImage> {
        image::load_from_memory_with_format(data, ImageFormat::Png).map(|res| res.to_rgba8())
    }
}

/// Byte range of the first chunk of `chunk_type`, including its length and crc.
pub fn find_chunk(data: &[u8], chunk_type: &[u8; 4]) -> Option<Range<usize>> {
    let mut offset = PNG_SIZE_PREFIX_LENGTH + PNG_SIGNATURE_LENGTH;

    while offset < data.len() {
        let length = be_u32_at(data, offset)? as usize;
        let end = offset
            .checked_add(length)?
            .checked_add(PNG_CHUNK_OVERHEAD)?;

        if end > data.len() {
            return None;
        }

        if bytes_equal(data, offset + 4, chunk_type) {
            return Some(offset..end);
        }

        offset = end;
    }

    None
}

/// Builds a complete PLTE chunk out of the palette, alpha is dropped.
pub fn plte_chunk(palette: &Palette) -> Vec<u8> {
    let colors = &palette.colors()[..palette.len().min(PNG_MAX_PALETTE_COLORS)];
    let mut chunk = Vec::with_capacity(colors.len() * 3 + PNG_CHUNK_OVERHEAD);

    chunk.extend(((colors.len() * 3) as u32).to_be_bytes());
    chunk.extend(PLTE);
    colors
        .iter()
        .for_each(|color| chunk.extend(&color.0[..3]));

    // crc covers type and data
    let crc = crc32fast::hash(&chunk[4..]);
    chunk.extend(crc.to_be_bytes());

    chunk
}

/// Replaces the zero filled PLTE chunk with one made from `palette`.
pub fn patch_palette(data: &[u8], palette: &Palette) -> Option<Vec<u8>> {
    let range = find_chunk(data, PLTE)?;
    let chunk = plte_chunk(palette);

    let mut res = Vec::with_capacity(data.len() - range.len() + chunk.len());
    res.extend_from_slice(&data[..range.start]);
    res.extend(chunk);
    res.extend_from_slice(&data[range.end..]);

    Some(res)
}

pub fn decode_png_truecolor(
    index: usize,
    data: &[u8],
    codec: &dyn PngCodec,
) -> SffResult<RgbaImage> {
    let png = data
        .get(PNG_SIZE_PREFIX_LENGTH..)
        .ok_or(SffError::Truncated)?;

    codec.decode_png(png).map_err(|err| {
        log::debug!("image {index}: png decode failed: {err}");
        SffError::PalettePatchFailed { index }
    })
}

pub fn decode_png8(
    index: usize,
    data: &[u8],
    palette: &Palette,
    codec: &dyn PngCodec,
) -> SffResult<RgbaImage> {
    if data.len() < PNG_SIZE_PREFIX_LENGTH {
        return Err(SffError::Truncated);
    }

    let patched = patch_palette(data, palette).ok_or_else(|| {
        log::debug!("image {index}: no PLTE chunk");
        SffError::PalettePatchFailed { index }
    })?;

    decode_png_truecolor(index, &patched, codec)
}
