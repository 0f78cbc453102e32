#[derive(Debug, thiserror::Error)]
pub enum SffError {
    #[error("File signature is not \"ElecbyteSpr\"")]
    WrongSignature,
    #[error("Unsupported sff version: {version:?}")]
    UnsupportedVersion { version: [u8; 4] },
    #[error("Bad header records")]
    MalformedHeader,
    #[error("Bad directory record on index {index}")]
    MalformedDirectoryEntry { index: usize },
    #[error("Record {index} is linked and points to itself")]
    SelfReferencingLink { index: usize },
    #[error("Link chain starting at record {index} does not end")]
    LinkCycle { index: usize },
    #[error("Data is shorter than expected")]
    Truncated,
    #[error("Record {index}: declared pixel count ({expect}) does not match image size ({have})")]
    SizeMismatch {
        index: usize,
        expect: usize,
        have: usize,
    },
    #[error("Record {index}: pcx data is not 8 bit single plane rle")]
    UnsupportedSubformat { index: usize },
    #[error("Record {index}: unsupported image type {image_type} with color depth {color_depth}")]
    UnsupportedFormat {
        index: usize,
        image_type: u8,
        color_depth: u8,
    },
    #[error("Record {index}: {width}x{height} image cannot come from {payload} bytes")]
    ImageTooLarge {
        index: usize,
        width: u32,
        height: u32,
        payload: usize,
    },
    #[error("Record {index}: cannot patch or decode png data")]
    PalettePatchFailed { index: usize },
    #[error("Record {index}: no palette available")]
    MissingPalette { index: usize },
    #[error("Index {index} is out of range")]
    IndexOutOfRange { index: usize },
    #[error("Sprite file is already closed")]
    ResourceClosed,
    #[error("IOError: {source}")]
    IOError {
        #[from]
        source: std::io::Error,
    },
}

pub type SffResult<T> = Result<T, SffError>;
