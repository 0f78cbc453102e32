use image::RgbaImage;

use super::check_dimensions;
use crate::{
    error::{SffError, SffResult},
    types::Palette,
    utils::le_u32_at,
};

const RLE8_RUN_MASK: u8 = 0xC0;
const RLE8_RUN_FLAG: u8 = 0x40;
const RLE8_LENGTH_MASK: u8 = 0x3F;

/// Decodes run length encoded palette indexes.
///
/// The first four bytes hold the decompressed size, which has to match the image size.
/// `0b01xxxxxx` starts a run of `xxxxxx` pixels of the next byte, anything else is a
/// single pixel.
pub fn decode_rle8(
    index: usize,
    data: &[u8],
    width: u32,
    height: u32,
    palette: &Palette,
) -> SffResult<RgbaImage> {
    let declared = le_u32_at(data, 0).ok_or(SffError::Truncated)? as usize;
    let pixel_count = width as usize * height as usize;

    if declared != pixel_count {
        return Err(SffError::SizeMismatch {
            index,
            expect: declared,
            have: pixel_count,
        });
    }

    check_dimensions(index, width, height, data.len())?;

    let mut image = RgbaImage::new(width, height);
    let mut pixels = image.pixels_mut().peekable();
    let mut stream = data[4..].iter();

    while pixels.peek().is_some() {
        let Some(&byte) = stream.next() else {
            break;
        };

        let (run_length, color_index) = if byte & RLE8_RUN_MASK == RLE8_RUN_FLAG {
            let Some(&color_index) = stream.next() else {
                break;
            };

            ((byte & RLE8_LENGTH_MASK) as usize, color_index)
        } else {
            (1, byte)
        };

        let color = palette.color(color_index);

        pixels
            .by_ref()
            .take(run_length)
            .for_each(|pixel| *pixel = color);
    }

    Ok(image)
}

#[cfg(test)]
mod test {
    use byte_writer::ByteWriter;
    use image::Rgba;

    use super::*;

    fn palette() -> Palette {
        Palette::from_rgb((0..=255u8).map(|i| [i, 255 - i, 0]))
    }

    fn rle8(pixel_count: u32, stream: &[u8]) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.append_u32(pixel_count);
        writer.append_u8_slice(stream);
        writer.data
    }

    #[test]
    fn flat_image() {
        let palette = palette();
        // 12 pixels of color 9 split over two runs
        let data = rle8(12, &[0x4a, 9, 0x42, 9]);

        let image = decode_rle8(0, &data, 4, 3, &palette).unwrap();

        assert_eq!(image.dimensions(), (4, 3));
        assert!(image.pixels().all(|pixel| *pixel == palette.color(9)));
    }

    #[test]
    fn literals_and_runs() {
        let palette = palette();
        let data = rle8(4, &[0x05, 0x43, 0x07]);

        let image = decode_rle8(0, &data, 2, 2, &palette).unwrap();

        assert_eq!(image.get_pixel(0, 0), &palette.color(5));
        assert_eq!(image.get_pixel(1, 0), &palette.color(7));
        assert_eq!(image.get_pixel(0, 1), &palette.color(7));
        assert_eq!(image.get_pixel(1, 1), &palette.color(7));
    }

    #[test]
    fn literal_with_high_bits() {
        let palette = palette();
        // 0xc5 and 0x85 are not runs in this dialect
        let data = rle8(2, &[0xc5, 0x85]);

        let image = decode_rle8(0, &data, 2, 1, &palette).unwrap();

        assert_eq!(image.get_pixel(0, 0), &palette.color(0xc5));
        assert_eq!(image.get_pixel(1, 0), &palette.color(0x85));
    }

    #[test]
    fn overlong_run_is_clipped() {
        let palette = palette();
        let data = rle8(2, &[0x7f, 1, 2, 3]);

        let image = decode_rle8(0, &data, 2, 1, &palette).unwrap();

        assert!(image.pixels().all(|pixel| *pixel == palette.color(1)));
    }

    #[test]
    fn huge_declared_image() {
        let data = rle8(65535 * 65535, &[0x7f, 1]);

        assert!(matches!(
            decode_rle8(2, &data, 65535, 65535, &palette()),
            Err(SffError::ImageTooLarge { index: 2, .. })
        ));
    }

    #[test]
    fn index_zero_is_transparent() {
        let palette = palette();
        let data = rle8(1, &[0x00]);

        let image = decode_rle8(0, &data, 1, 1, &palette).unwrap();

        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 255, 0, 0]));
    }

    #[test]
    fn size_mismatch() {
        let data = rle8(10, &[0x4a, 1]);

        assert!(matches!(
            decode_rle8(4, &data, 3, 3, &palette()),
            Err(SffError::SizeMismatch {
                index: 4,
                expect: 10,
                have: 9
            })
        ));
    }

    #[test]
    fn too_short() {
        assert!(matches!(
            decode_rle8(0, &[1, 0, 0], 1, 1, &palette()),
            Err(SffError::Truncated)
        ));
    }
}
