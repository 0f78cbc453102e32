use image::Rgba;

pub const SIGNATURE: &[u8; 12] = b"ElecbyteSpr\0";
pub const VERSION_V1: [u8; 4] = [0, 1, 0, 1];
pub const VERSION_V2_0: [u8; 4] = [0, 0, 0, 2];
pub const VERSION_V2_1: [u8; 4] = [0, 1, 0, 2];

pub const FILE_HEADER_LENGTH: usize = 16;
pub const V1_HEADER_LENGTH: usize = 20;
pub const V1_SUBFILE_HEADER_LENGTH: usize = 19;
/// Image data starts this many bytes after the subfile header offset.
pub const V1_SUBFILE_DATA_SKIP: u32 = 0x20;
pub const V2_HEADER_LENGTH: usize = 52;
pub const V2_PALETTE_RECORD_LENGTH: usize = 16;
pub const V2_SPRITE_RECORD_LENGTH: usize = 28;

pub const MAX_RECORD_COUNT: u32 = 65535;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    V1,
    /// `png_capable` is set for the 2.1 revision.
    V2 { png_capable: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Raw,
    /// Mostly seen on linked records.
    Invalid,
    Rle8,
    Rle5,
    Lz5,
    Png8,
    Png24,
    Png32,
}

impl ImageType {
    pub fn from_id(id: u8) -> Option<Self> {
        let res = match id {
            0 => Self::Raw,
            1 => Self::Invalid,
            2 => Self::Rle8,
            3 => Self::Rle5,
            4 => Self::Lz5,
            10 => Self::Png8,
            11 => Self::Png24,
            12 => Self::Png32,
            _ => return None,
        };

        Some(res)
    }

    pub fn id(&self) -> u8 {
        match self {
            Self::Raw => 0,
            Self::Invalid => 1,
            Self::Rle8 => 2,
            Self::Rle5 => 3,
            Self::Lz5 => 4,
            Self::Png8 => 10,
            Self::Png24 => 11,
            Self::Png32 => 12,
        }
    }
}

/// How the pixels of a sprite are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteFormat {
    /// Version 1 sprites are always 8 bit rle pcx files.
    Pcx { shared_palette: bool },
    Packed {
        width: u16,
        height: u16,
        image_type: ImageType,
        color_depth: u8,
        palette_index: u16,
        flags: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteRecord {
    pub group: u16,
    pub number: u16,
    pub center_x: i16,
    pub center_y: i16,
    /// Absolute offset from the start of the file.
    pub data_offset: u32,
    pub data_length: u32,
    /// Only meaningful when `data_length` is 0.
    pub link_index: u32,
    pub format: SpriteFormat,
}

impl SpriteRecord {
    pub fn is_linked(&self) -> bool {
        self.data_length == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteRecord {
    pub group: u16,
    pub number: u16,
    pub color_count: u16,
    pub link_index: u32,
    pub data_offset: u32,
    pub data_length: u32,
}

impl PaletteRecord {
    pub fn is_linked(&self) -> bool {
        self.data_length == 0
    }
}

/// Palette colors in order of color index.
///
/// Index 0 is always fully transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette(pub Vec<Rgba<u8>>);

impl Palette {
    /// Builds a palette from RGB triples. Alpha is opaque except for index 0.
    pub fn from_rgb(colors: impl IntoIterator<Item = [u8; 3]>) -> Self {
        Self(
            colors
                .into_iter()
                .enumerate()
                .map(|(i, [r, g, b])| Rgba([r, g, b, if i == 0 { 0 } else { 255 }]))
                .collect(),
        )
    }

    /// Color out of palette range is transparent black.
    pub fn color(&self, index: u8) -> Rgba<u8> {
        self.0
            .get(index as usize)
            .copied()
            .unwrap_or(Rgba([0, 0, 0, 0]))
    }

    pub fn colors(&self) -> &[Rgba<u8>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug)]
pub enum Directory {
    V1 {
        sprites: Vec<SpriteRecord>,
        /// Palette of the first image, used by every image flagged as shared.
        shared_palette: Option<Palette>,
    },
    V2 {
        sprites: Vec<SpriteRecord>,
        palettes: Vec<PaletteRecord>,
        png_capable: bool,
    },
}

impl Directory {
    pub fn version(&self) -> FormatVersion {
        match self {
            Directory::V1 { .. } => FormatVersion::V1,
            Directory::V2 { png_capable, .. } => FormatVersion::V2 {
                png_capable: *png_capable,
            },
        }
    }

    pub fn sprites(&self) -> &[SpriteRecord] {
        match self {
            Directory::V1 { sprites, .. } | Directory::V2 { sprites, .. } => sprites,
        }
    }

    pub fn palettes(&self) -> &[PaletteRecord] {
        match self {
            Directory::V1 { .. } => &[],
            Directory::V2 { palettes, .. } => palettes,
        }
    }
}

// Raw on-disk layouts, before validation.

pub struct V1Header {
    pub image_total: u32,
    pub first_offset: u32,
}

pub struct V1SubfileHeader {
    pub next_offset: u32,
    pub data_length: u32,
    pub center_x: i16,
    pub center_y: i16,
    pub group: u16,
    pub number: u16,
    pub link_index: u16,
    pub palette_mode: u8,
}

pub struct V2Header {
    pub sprite_offset: u32,
    pub sprite_count: u32,
    pub palette_offset: u32,
    pub palette_count: u32,
    pub ldata_offset: u32,
    pub tdata_offset: u32,
}

pub struct V2PaletteEntry {
    pub group: u16,
    pub number: u16,
    pub color_count: u16,
    pub link_index: u16,
    pub data_offset: u32,
    pub data_length: u32,
}

pub struct V2SpriteEntry {
    pub group: u16,
    pub number: u16,
    pub width: u16,
    pub height: u16,
    pub center_x: i16,
    pub center_y: i16,
    pub link_index: u16,
    pub image_type: u8,
    pub color_depth: u8,
    pub data_offset: u32,
    pub data_length: u32,
    pub palette_index: u16,
    pub flags: u16,
}
