//! Pixel decoders.
//!
//! Version 1 images are always pcx. Version 2 images pick the decoder from their image type
//! and color depth.
use image::RgbaImage;

use crate::{
    error::{SffError, SffResult},
    types::{ImageType, Palette},
};

pub mod pcx;
pub mod png;
pub mod raw;
pub mod rle8;

pub use png::{ImagePngCodec, PngCodec};

/// A run of 63 pixels takes two bytes, so no stored format gets close to this.
const MAX_PIXELS_PER_PAYLOAD_BYTE: u64 = 64;

/// Rejects header dimensions the payload could never fill before allocating the image.
pub fn check_dimensions(index: usize, width: u32, height: u32, payload: usize) -> SffResult<()> {
    let pixels = width as u64 * height as u64;

    if pixels > payload as u64 * MAX_PIXELS_PER_PAYLOAD_BYTE {
        return Err(SffError::ImageTooLarge {
            index,
            width,
            height,
            payload,
        });
    }

    Ok(())
}

/// Image description of a version 2 sprite after link resolution.
#[derive(Debug, Clone, Copy)]
pub struct PackedImage {
    pub width: u32,
    pub height: u32,
    pub image_type: ImageType,
    pub color_depth: u8,
}

pub fn decode_packed(
    index: usize,
    image: PackedImage,
    data: &[u8],
    palette: Option<&Palette>,
    codec: &dyn PngCodec,
) -> SffResult<RgbaImage> {
    let PackedImage {
        width,
        height,
        image_type,
        color_depth,
    } = image;

    let missing_palette = || SffError::MissingPalette { index };

    match (image_type, color_depth) {
        (ImageType::Raw, _) => raw::decode_raw(index, data, width, height, color_depth, palette),
        (ImageType::Rle8, 8) => rle8::decode_rle8(
            index,
            data,
            width,
            height,
            palette.ok_or_else(missing_palette)?,
        ),
        (ImageType::Png8, 8) => {
            png::decode_png8(index, data, palette.ok_or_else(missing_palette)?, codec)
        }
        (ImageType::Png24, 24) | (ImageType::Png32, 32) => {
            png::decode_png_truecolor(index, data, codec)
        }
        // TODO: rle5 and lz5
        _ => Err(SffError::UnsupportedFormat {
            index,
            image_type: image_type.id(),
            color_depth,
        }),
    }
}
