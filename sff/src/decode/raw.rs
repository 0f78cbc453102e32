use image::{Rgba, RgbaImage};

use super::check_dimensions;
use crate::{
    error::{SffError, SffResult},
    types::{ImageType, Palette},
};

/// Unpacks uncompressed pixels row by row.
///
/// Stops when the image is full or the data runs out, whichever comes first.
pub fn decode_raw(
    index: usize,
    data: &[u8],
    width: u32,
    height: u32,
    color_depth: u8,
    palette: Option<&Palette>,
) -> SffResult<RgbaImage> {
    check_dimensions(index, width, height, data.len())?;

    let mut image = RgbaImage::new(width, height);

    match color_depth {
        8 => {
            let palette = palette.ok_or(SffError::MissingPalette { index })?;

            image
                .pixels_mut()
                .zip(data.iter())
                .for_each(|(pixel, color_index)| *pixel = palette.color(*color_index));
        }
        24 => image
            .pixels_mut()
            .zip(data.chunks_exact(3))
            .for_each(|(pixel, rgb)| *pixel = Rgba([rgb[0], rgb[1], rgb[2], 255])),
        32 => image
            .pixels_mut()
            .zip(data.chunks_exact(4))
            .for_each(|(pixel, rgba)| *pixel = Rgba([rgba[0], rgba[1], rgba[2], rgba[3]])),
        _ => {
            return Err(SffError::UnsupportedFormat {
                index,
                image_type: ImageType::Raw.id(),
                color_depth,
            })
        }
    }

    Ok(image)
}

#[cfg(test)]
mod test {
    use super::*;

    fn gray_palette() -> Palette {
        Palette::from_rgb((0..=255u8).map(|i| [i, i, i]))
    }

    #[test]
    fn indexed_2x2() {
        let palette = gray_palette();
        let image = decode_raw(0, &[0, 1, 2, 3], 2, 2, 8, Some(&palette)).unwrap();

        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(image.get_pixel(1, 0), &palette.color(1));
        assert_eq!(image.get_pixel(0, 1), &palette.color(2));
        assert_eq!(image.get_pixel(1, 1), &Rgba([3, 3, 3, 255]));
    }

    #[test]
    fn truecolor() {
        let image = decode_raw(0, &[1, 2, 3, 4, 5, 6], 2, 1, 24, None).unwrap();

        assert_eq!(image.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([4, 5, 6, 255]));

        let image = decode_raw(0, &[1, 2, 3, 4, 5, 6, 7, 0], 2, 1, 32, None).unwrap();

        assert_eq!(image.get_pixel(0, 0), &Rgba([1, 2, 3, 4]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([5, 6, 7, 0]));
    }

    #[test]
    fn short_data_leaves_rest_empty() {
        let palette = gray_palette();
        let image = decode_raw(0, &[7, 8, 9, 10, 11], 2, 2, 8, Some(&palette)).unwrap();

        assert_eq!(image.get_pixel(1, 1), &Rgba([10, 10, 10, 255]));

        let image = decode_raw(0, &[7], 2, 2, 8, Some(&palette)).unwrap();

        assert_eq!(image.get_pixel(0, 0), &Rgba([7, 7, 7, 255]));
        assert_eq!(image.get_pixel(1, 1), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn bad_depth() {
        assert!(matches!(
            decode_raw(3, &[0; 4], 1, 1, 16, None),
            Err(SffError::UnsupportedFormat {
                index: 3,
                color_depth: 16,
                ..
            })
        ));
        assert!(matches!(
            decode_raw(3, &[0; 4], 1, 1, 8, None),
            Err(SffError::MissingPalette { index: 3 })
        ));
    }
}
