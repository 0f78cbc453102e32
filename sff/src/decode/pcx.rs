use image::RgbaImage;
use nom::{
    bytes::complete::take,
    combinator::map,
    number::complete::{le_u16, le_u8},
    Parser,
};

use super::check_dimensions;
use crate::{
    error::{SffError, SffResult},
    palette::PCX_HEADER_LENGTH,
    parser::IResult,
    types::Palette,
};

const PCX_RUN_MASK: u8 = 0xC0;
const PCX_LENGTH_MASK: u8 = 0x3F;

pub struct PcxHeader {
    pub manufacturer: u8,
    pub version: u8,
    pub encoding: u8,
    pub bits_per_pixel: u8,
    pub x_min: u16,
    pub y_min: u16,
    pub x_max: u16,
    pub y_max: u16,
    pub color_planes: u8,
    /// Stride of one decoded scanline, may be wider than the image.
    pub bytes_per_line: u16,
}

impl PcxHeader {
    /// Only 8 bit, single plane, run length encoded files are used in sprite files.
    pub fn is_supported(&self) -> bool {
        self.manufacturer == 10
            && self.version == 5
            && self.encoding == 1
            && self.bits_per_pixel == 8
            && self.color_planes == 1
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let width = self.x_max.checked_sub(self.x_min)? as u32 + 1;
        let height = self.y_max.checked_sub(self.y_min)? as u32 + 1;

        Some((width, height))
    }
}

pub fn parse_pcx_header(i: &'_ [u8]) -> IResult<'_, PcxHeader> {
    map(
        (
            le_u8,
            le_u8,
            le_u8,
            le_u8,
            le_u16,
            le_u16,
            le_u16,
            le_u16,
            // dpi, 16 color palette, reserved
            take(53usize),
            le_u8,
            le_u16,
        ),
        |(
            manufacturer,
            version,
            encoding,
            bits_per_pixel,
            x_min,
            y_min,
            x_max,
            y_max,
            _,
            color_planes,
            bytes_per_line,
        )| PcxHeader {
            manufacturer,
            version,
            encoding,
            bits_per_pixel,
            x_min,
            y_min,
            x_max,
            y_max,
            color_planes,
            bytes_per_line,
        },
    )
    .parse(i)
}

/// Decodes an 8 bit pcx file.
///
/// `0b11xxxxxx` starts a run of `xxxxxx` pixels of the next byte, anything else is a
/// single pixel. The cursor wraps at the scanline stride and columns past the image
/// width are dropped.
pub fn decode_pcx(index: usize, data: &[u8], palette: &Palette) -> SffResult<RgbaImage> {
    if data.len() < PCX_HEADER_LENGTH {
        return Err(SffError::Truncated);
    }

    let (_, header) = parse_pcx_header(data).map_err(|_| SffError::Truncated)?;

    if !header.is_supported() || header.bytes_per_line == 0 {
        return Err(SffError::UnsupportedSubformat { index });
    }

    let (width, height) = header
        .dimensions()
        .ok_or(SffError::UnsupportedSubformat { index })?;
    let stride = header.bytes_per_line as u32;

    check_dimensions(index, width, height, data.len())?;

    let mut image = RgbaImage::new(width, height);

    let mut x = 0u32;
    let mut y = 0u32;
    let mut stream = data[PCX_HEADER_LENGTH..].iter();

    'stream: while let Some(&byte) = stream.next() {
        let (run_length, color_index) = if byte & PCX_RUN_MASK == PCX_RUN_MASK {
            let Some(&color_index) = stream.next() else {
                break;
            };

            (byte & PCX_LENGTH_MASK, color_index)
        } else {
            (1, byte)
        };

        let color = palette.color(color_index);

        for _ in 0..run_length {
            if x < width {
                image.put_pixel(x, y, color);
            }

            x += 1;

            if x >= stride {
                x = 0;
                y += 1;

                if y >= height {
                    break 'stream;
                }
            }
        }
    }

    Ok(image)
}

#[cfg(test)]
mod test {
    use byte_writer::ByteWriter;
    use image::Rgba;

    use super::*;

    fn pcx(width: u16, height: u16, stride: u16, stream: &[u8]) -> Vec<u8> {
        let mut writer = ByteWriter::new();

        writer.append_u8_slice(&[10, 5, 1, 8]);
        writer.append_u16(0);
        writer.append_u16(0);
        writer.append_u16(width - 1);
        writer.append_u16(height - 1);
        writer.append_zeroes(53);
        writer.append_u8(1);
        writer.append_u16(stride);
        writer.pad_to(PCX_HEADER_LENGTH);
        writer.append_u8_slice(stream);

        writer.data
    }

    fn palette() -> Palette {
        Palette::from_rgb((0..=255u8).map(|i| [i, i, 0]))
    }

    #[test]
    fn single_pixel_run() {
        let palette = palette();
        let image = decode_pcx(0, &pcx(1, 1, 1, &[0xc1, 0x05]), &palette).unwrap();

        assert_eq!(image.dimensions(), (1, 1));
        assert_eq!(image.get_pixel(0, 0), &palette.color(5));
    }

    #[test]
    fn stride_wider_than_image() {
        let palette = palette();
        // 3x2 image stored with 4 byte scanlines, last column is padding
        let stream = [1, 2, 3, 0xc1, 0xff, 0xc3, 4, 0];

        let image = decode_pcx(0, &pcx(3, 2, 4, &stream), &palette).unwrap();

        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(0, 0), &palette.color(1));
        assert_eq!(image.get_pixel(2, 0), &palette.color(3));
        assert_eq!(image.get_pixel(0, 1), &palette.color(4));
        assert_eq!(image.get_pixel(2, 1), &palette.color(4));
    }

    #[test]
    fn trailing_palette_is_not_decoded() {
        let palette = palette();
        let mut stream = vec![0xc4, 7];
        stream.push(0x0c);
        stream.extend([0xaa; 768]);

        let image = decode_pcx(0, &pcx(2, 2, 2, &stream), &palette).unwrap();

        assert!(image.pixels().all(|pixel| *pixel == palette.color(7)));
    }

    #[test]
    fn index_zero_is_transparent() {
        let image = decode_pcx(0, &pcx(1, 1, 1, &[0]), &palette()).unwrap();

        assert_eq!(image.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn wrong_magic() {
        let mut data = pcx(1, 1, 1, &[0]);
        data[1] = 3;

        assert!(matches!(
            decode_pcx(2, &data, &palette()),
            Err(SffError::UnsupportedSubformat { index: 2 })
        ));

        let mut data = pcx(1, 1, 1, &[0]);
        data[65] = 3;

        assert!(matches!(
            decode_pcx(2, &data, &palette()),
            Err(SffError::UnsupportedSubformat { index: 2 })
        ));
    }

    #[test]
    fn huge_bounding_box() {
        assert!(matches!(
            decode_pcx(3, &pcx(65535, 65535, 65535, &[0xff, 1]), &palette()),
            Err(SffError::ImageTooLarge {
                index: 3,
                width: 65535,
                height: 65535,
                ..
            })
        ));
    }

    #[test]
    fn too_short() {
        assert!(matches!(
            decode_pcx(0, &[10, 5, 1, 8], &palette()),
            Err(SffError::Truncated)
        ));
    }
}
