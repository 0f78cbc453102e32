//! Elecbyte sprite file (sff) decoding
//!
//! Supports version 1 (pcx images), version 2.0 (raw and rle8 images) and version 2.1 (png images).
use std::{
    fs::File,
    io::{Cursor, Read, Seek},
    path::Path,
};

use image::RgbaImage;

pub mod decode;
pub mod error;
mod cursor;
mod index;
mod link;
mod palette;
mod parser;
mod types;
mod utils;

pub use cursor::ByteCursor;
pub use decode::{ImagePngCodec, PngCodec};
pub use error::{SffError, SffResult};
pub use index::SpriteIndex;
pub use palette::{pcx_trailer_palette, rgbx_palette};
pub use types::*;

use decode::{decode_packed, pcx::decode_pcx, PackedImage};
use palette::PCX_PALETTE_COLORS;

/// An opened sprite file.
///
/// The directory is read when opening. Image data is only read when asked for, so every read
/// goes through `&mut self`. Open one handle per thread to decode in parallel.
pub struct Sff<R> {
    cursor: ByteCursor<R>,
    directory: Directory,
    index: SpriteIndex,
    codec: Box<dyn PngCodec + Send + Sync>,
}

impl Sff<File> {
    pub fn open_from_file(path: impl AsRef<Path>) -> SffResult<Self> {
        let file = File::open(path)?;

        Self::new(file)
    }
}

impl Sff<Cursor<Vec<u8>>> {
    pub fn open_from_bytes(bytes: impl Into<Vec<u8>>) -> SffResult<Self> {
        Self::new(Cursor::new(bytes.into()))
    }
}

impl<R: Read + Seek> Sff<R> {
    pub fn new(source: R) -> SffResult<Self> {
        let mut cursor = ByteCursor::new(source)?;
        let directory = parser::read_directory(&mut cursor)?;
        let index = SpriteIndex::new(directory.sprites());

        Ok(Self {
            cursor,
            directory,
            index,
            codec: Box::new(ImagePngCodec),
        })
    }

    /// Replaces the decoder used for png images.
    pub fn with_png_codec(mut self, codec: impl PngCodec + Send + Sync + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    pub fn version(&self) -> FormatVersion {
        self.directory.version()
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn image_count(&self) -> usize {
        self.directory.sprites().len()
    }

    /// Always 0 for version 1.
    pub fn palette_count(&self) -> usize {
        self.directory.palettes().len()
    }

    pub fn sprites(&self) -> &[SpriteRecord] {
        self.directory.sprites()
    }

    pub fn sprite(&self, index: usize) -> Option<&SpriteRecord> {
        self.directory.sprites().get(index)
    }

    pub fn palette_record(&self, palette_index: usize) -> Option<&PaletteRecord> {
        self.directory.palettes().get(palette_index)
    }

    /// Index of the record this one links to, `None` if it has its own data.
    pub fn link_target(&self, index: usize) -> Option<usize> {
        self.sprite(index)
            .filter(|sprite| sprite.is_linked())
            .map(|sprite| sprite.link_index as usize)
    }

    /// Version 1 only, always false for version 2.
    pub fn is_shared_palette(&self, index: usize) -> bool {
        matches!(
            self.sprite(index).map(|sprite| sprite.format),
            Some(SpriteFormat::Pcx {
                shared_palette: true
            })
        )
    }

    /// Version 1 palette taken from the first image.
    pub fn shared_palette(&self) -> Option<&Palette> {
        match &self.directory {
            Directory::V1 { shared_palette, .. } => shared_palette.as_ref(),
            Directory::V2 { .. } => None,
        }
    }

    /// First record with these numbers.
    pub fn find_index(&self, group: u16, number: u16) -> Option<usize> {
        self.index.find(group, number)
    }

    pub fn indexes_in_group(&self, group: u16) -> &[usize] {
        self.index.group(group)
    }

    /// Stored image data of a record, following links.
    pub fn raw_payload(&mut self, index: usize) -> SffResult<Vec<u8>> {
        let target = link::resolve(self.directory.sprites(), index)?;

        self.read_sprite_data(target)
    }

    /// Version 2 palette from the palette table, following links.
    pub fn palette(&mut self, palette_index: usize) -> SffResult<Palette> {
        let palettes = self.directory.palettes();
        let target = link::resolve(palettes, palette_index)?;
        let record = palettes[target].clone();

        let data = self
            .cursor
            .read(record.data_offset as u64, record.data_length as usize)?;

        rgbx_palette(&data, record.color_count as usize)
    }

    /// Palette that [`Self::decode`] uses for this record. `None` for direct color images
    /// and for images whose palette is missing.
    pub fn sprite_palette(&mut self, index: usize) -> SffResult<Option<Palette>> {
        let target = link::resolve(self.directory.sprites(), index)?;
        let format = self.directory.sprites()[target].format;

        match format {
            SpriteFormat::Pcx { .. } => {
                let data = self.read_sprite_data(target)?;

                Ok(self.pcx_palette(index, &data))
            }
            SpriteFormat::Packed {
                color_depth,
                palette_index,
                ..
            } => self.packed_palette(color_depth, palette_index),
        }
    }

    pub fn decode(&mut self, index: usize) -> SffResult<RgbaImage> {
        self.decode_inner(index, None)
    }

    /// Decodes with a caller palette instead of the stored one.
    ///
    /// The palette is only used for indexed images and only if it is complete (256 colors),
    /// otherwise the stored palette is used.
    pub fn decode_with_palette(&mut self, index: usize, palette: &Palette) -> SffResult<RgbaImage> {
        self.decode_inner(index, Some(palette))
    }

    /// Releases the underlying file. Reading image data afterwards fails with
    /// [`SffError::ResourceClosed`], record information stays available.
    pub fn close(&mut self) {
        self.cursor.close();
    }

    pub fn is_closed(&self) -> bool {
        self.cursor.is_closed()
    }

    fn read_sprite_data(&mut self, index: usize) -> SffResult<Vec<u8>> {
        let sprite = &self.directory.sprites()[index];

        self.cursor
            .read(sprite.data_offset as u64, sprite.data_length as usize)
    }

    fn pcx_palette(&self, index: usize, data: &[u8]) -> Option<Palette> {
        if self.is_shared_palette(index) {
            self.shared_palette().cloned()
        } else {
            pcx_trailer_palette(data)
        }
    }

    fn packed_palette(&mut self, color_depth: u8, palette_index: u16) -> SffResult<Option<Palette>> {
        if color_depth != 8 || self.palette_count() == 0 {
            return Ok(None);
        }

        self.palette(palette_index as usize).map(Some)
    }

    fn decode_inner(&mut self, index: usize, custom_palette: Option<&Palette>) -> SffResult<RgbaImage> {
        if self.is_closed() {
            return Err(SffError::ResourceClosed);
        }

        let target = link::resolve(self.directory.sprites(), index)?;
        let format = self.directory.sprites()[target].format;
        let data = self.read_sprite_data(target)?;

        let custom_palette = custom_palette.filter(|palette| palette.len() == PCX_PALETTE_COLORS);

        match format {
            SpriteFormat::Pcx { .. } => {
                let palette = match custom_palette {
                    Some(palette) => palette.clone(),
                    None => self
                        .pcx_palette(index, &data)
                        .ok_or(SffError::MissingPalette { index })?,
                };

                decode_pcx(target, &data, &palette)
            }
            SpriteFormat::Packed {
                width,
                height,
                image_type,
                color_depth,
                palette_index,
                ..
            } => {
                let palette = match custom_palette {
                    Some(palette) if color_depth == 8 => Some(palette.clone()),
                    _ => self.packed_palette(color_depth, palette_index)?,
                };

                decode_packed(
                    target,
                    PackedImage {
                        width: width as u32,
                        height: height as u32,
                        image_type,
                        color_depth,
                    },
                    &data,
                    palette.as_ref(),
                    self.codec.as_ref(),
                )
            }
        }
    }
}
