use std::io::{Read, Seek};

use nom::{
    bytes::complete::take,
    combinator::map,
    number::complete::{le_i16, le_u16, le_u32, le_u8},
    IResult as _IResult, Parser,
};

use crate::{
    cursor::ByteCursor,
    error::{SffError, SffResult},
    link,
    palette::pcx_trailer_palette,
    types::{
        Directory, FormatVersion, ImageType, Palette, PaletteRecord, SpriteFormat, SpriteRecord,
        V1Header, V1SubfileHeader, V2Header, V2PaletteEntry, V2SpriteEntry, FILE_HEADER_LENGTH,
        MAX_RECORD_COUNT, SIGNATURE, V1_HEADER_LENGTH, V1_SUBFILE_DATA_SKIP,
        V1_SUBFILE_HEADER_LENGTH, V2_HEADER_LENGTH, V2_PALETTE_RECORD_LENGTH,
        V2_SPRITE_RECORD_LENGTH, VERSION_V1, VERSION_V2_0, VERSION_V2_1,
    },
    utils::{bytes_equal, in_range, range_fits},
};

pub type IResult<'a, T> = _IResult<&'a [u8], T>;

// Buffers are read with their exact length before parsing, so running out of input means
// the record itself is short.
fn finish<T>(res: IResult<'_, T>) -> SffResult<T> {
    res.map(|(_, res)| res).map_err(|_| SffError::Truncated)
}

pub fn parse_version(i: &[u8]) -> SffResult<FormatVersion> {
    if i.len() < FILE_HEADER_LENGTH {
        return Err(SffError::Truncated);
    }

    if !bytes_equal(i, 0, SIGNATURE) {
        return Err(SffError::WrongSignature);
    }

    let version: [u8; 4] = [i[12], i[13], i[14], i[15]];

    match version {
        VERSION_V1 => Ok(FormatVersion::V1),
        VERSION_V2_0 => Ok(FormatVersion::V2 { png_capable: false }),
        VERSION_V2_1 => Ok(FormatVersion::V2 { png_capable: true }),
        _ => Err(SffError::UnsupportedVersion { version }),
    }
}

pub fn parse_v1_header(i: &'_ [u8]) -> IResult<'_, V1Header> {
    map(
        (take(4usize), le_u32, le_u32),
        |(_, image_total, first_offset)| V1Header {
            image_total,
            first_offset,
        },
    )
    .parse(i)
}

pub fn parse_v1_subfile_header(i: &'_ [u8]) -> IResult<'_, V1SubfileHeader> {
    map(
        (
            le_u32, le_u32, le_i16, le_i16, le_u16, le_u16, le_u16, le_u8,
        ),
        |(
            next_offset,
            data_length,
            center_x,
            center_y,
            group,
            number,
            link_index,
            palette_mode,
        )| V1SubfileHeader {
            next_offset,
            data_length,
            center_x,
            center_y,
            group,
            number,
            link_index,
            palette_mode,
        },
    )
    .parse(i)
}

pub fn parse_v2_header(i: &'_ [u8]) -> IResult<'_, V2Header> {
    map(
        (
            take(20usize),
            le_u32,
            le_u32,
            le_u32,
            le_u32,
            le_u32,
            le_u32,
            le_u32,
        ),
        |(
            _,
            sprite_offset,
            sprite_count,
            palette_offset,
            palette_count,
            ldata_offset,
            _ldata_length,
            tdata_offset,
        )| V2Header {
            sprite_offset,
            sprite_count,
            palette_offset,
            palette_count,
            ldata_offset,
            tdata_offset,
        },
    )
    .parse(i)
}

pub fn parse_palette_entry(i: &'_ [u8]) -> IResult<'_, V2PaletteEntry> {
    map(
        (le_u16, le_u16, le_u16, le_u16, le_u32, le_u32),
        |(group, number, color_count, link_index, data_offset, data_length)| V2PaletteEntry {
            group,
            number,
            color_count,
            link_index,
            data_offset,
            data_length,
        },
    )
    .parse(i)
}

pub fn parse_sprite_entry(i: &'_ [u8]) -> IResult<'_, V2SpriteEntry> {
    map(
        (
            le_u16, le_u16, le_u16, le_u16, le_i16, le_i16, le_u16, le_u8, le_u8, le_u32, le_u32,
            le_u16, le_u16,
        ),
        |(
            group,
            number,
            width,
            height,
            center_x,
            center_y,
            link_index,
            image_type,
            color_depth,
            data_offset,
            data_length,
            palette_index,
            flags,
        )| V2SpriteEntry {
            group,
            number,
            width,
            height,
            center_x,
            center_y,
            link_index,
            image_type,
            color_depth,
            data_offset,
            data_length,
            palette_index,
            flags,
        },
    )
    .parse(i)
}

/// Reads the file header and the whole directory of either version.
pub fn read_directory<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> SffResult<Directory> {
    let header = cursor.read(0, FILE_HEADER_LENGTH)?;

    match parse_version(&header)? {
        FormatVersion::V1 => read_v1_directory(cursor),
        FormatVersion::V2 { png_capable } => read_v2_directory(cursor, png_capable),
    }
}

fn read_v1_directory<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> SffResult<Directory> {
    let file_length = cursor.len();

    let header = finish(parse_v1_header(
        &cursor.read(FILE_HEADER_LENGTH as u64, V1_HEADER_LENGTH)?,
    ))?;

    if !in_range(header.image_total, 0, MAX_RECORD_COUNT)
        || !in_range(header.first_offset as u64, 0, file_length)
    {
        return Err(SffError::MalformedHeader);
    }

    log::debug!(
        "sff v1: {} images, first subfile at {:#x}",
        header.image_total,
        header.first_offset
    );

    let image_total = header.image_total as usize;
    let mut sprites = Vec::with_capacity(image_total);
    let mut subfile_offset = header.first_offset;

    for index in 0..image_total {
        let subfile = finish(parse_v1_subfile_header(
            &cursor.read(subfile_offset as u64, V1_SUBFILE_HEADER_LENGTH)?,
        ))?;

        let data_offset = subfile_offset
            .checked_add(V1_SUBFILE_DATA_SKIP)
            .ok_or(SffError::MalformedDirectoryEntry { index })?;

        if !in_range(subfile.next_offset as u64, 0, file_length)
            || !in_range(subfile.data_length as u64, 0, file_length)
            || !in_range(subfile.link_index as usize, 0, image_total)
            || !in_range(subfile.palette_mode, 0, 1)
            || !range_fits(data_offset, subfile.data_length, file_length)
        {
            return Err(SffError::MalformedDirectoryEntry { index });
        }

        if subfile.data_length == 0 && subfile.link_index as usize == index {
            return Err(SffError::SelfReferencingLink { index });
        }

        sprites.push(SpriteRecord {
            group: subfile.group,
            number: subfile.number,
            center_x: subfile.center_x,
            center_y: subfile.center_y,
            data_offset,
            data_length: subfile.data_length,
            link_index: subfile.link_index as u32,
            format: SpriteFormat::Pcx {
                shared_palette: subfile.palette_mode == 1,
            },
        });

        subfile_offset = subfile.next_offset;
    }

    // Failure is not fatal here, images asking for the shared palette fail when decoded.
    let shared_palette = if sprites.is_empty() {
        None
    } else {
        match read_shared_palette(cursor, &sprites) {
            Ok(Some(palette)) => Some(palette),
            Ok(None) => {
                log::warn!("sff v1: first image does not carry a palette");
                None
            }
            Err(err) => {
                log::warn!("sff v1: cannot read shared palette: {err}");
                None
            }
        }
    };

    Ok(Directory::V1 {
        sprites,
        shared_palette,
    })
}

fn read_shared_palette<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    sprites: &[SpriteRecord],
) -> SffResult<Option<Palette>> {
    let target = &sprites[link::resolve(sprites, 0)?];
    let data = cursor.read(target.data_offset as u64, target.data_length as usize)?;

    Ok(pcx_trailer_palette(&data))
}

fn read_v2_directory<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    png_capable: bool,
) -> SffResult<Directory> {
    let file_length = cursor.len();

    let header = finish(parse_v2_header(
        &cursor.read(FILE_HEADER_LENGTH as u64, V2_HEADER_LENGTH)?,
    ))?;

    if !in_range(header.sprite_offset as u64, 0, file_length)
        || !in_range(header.sprite_count, 0, MAX_RECORD_COUNT)
        || !in_range(header.palette_offset as u64, 0, file_length)
        || !in_range(header.palette_count, 0, MAX_RECORD_COUNT)
        || !in_range(header.ldata_offset as u64, 0, file_length)
        || !in_range(header.tdata_offset as u64, 0, file_length)
    {
        return Err(SffError::MalformedHeader);
    }

    log::debug!(
        "sff v2{}: {} sprites, {} palettes",
        if png_capable { ".1" } else { "" },
        header.sprite_count,
        header.palette_count
    );

    let palettes = read_palette_table(cursor, &header)?;
    let sprites = read_sprite_table(cursor, &header)?;

    Ok(Directory::V2 {
        sprites,
        palettes,
        png_capable,
    })
}

fn read_palette_table<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    header: &V2Header,
) -> SffResult<Vec<PaletteRecord>> {
    let file_length = cursor.len();
    let palette_count = header.palette_count as usize;

    let table = cursor.read(
        header.palette_offset as u64,
        palette_count * V2_PALETTE_RECORD_LENGTH,
    )?;

    table
        .chunks_exact(V2_PALETTE_RECORD_LENGTH)
        .enumerate()
        .map(|(index, record)| {
            let entry = finish(parse_palette_entry(record))?;

            let data_offset = entry
                .data_offset
                .checked_add(header.ldata_offset)
                .ok_or(SffError::MalformedDirectoryEntry { index })?;

            // the link field of a palette with its own data is never read
            let dangling_link = entry.data_length == 0 && entry.link_index as usize >= palette_count;

            if !range_fits(data_offset, entry.data_length, file_length) || dangling_link {
                return Err(SffError::MalformedDirectoryEntry { index });
            }

            if entry.data_length == 0 && entry.link_index as usize == index {
                return Err(SffError::SelfReferencingLink { index });
            }

            Ok(PaletteRecord {
                group: entry.group,
                number: entry.number,
                color_count: entry.color_count,
                link_index: entry.link_index as u32,
                data_offset,
                data_length: entry.data_length,
            })
        })
        .collect()
}

fn read_sprite_table<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    header: &V2Header,
) -> SffResult<Vec<SpriteRecord>> {
    let file_length = cursor.len();
    let sprite_count = header.sprite_count as usize;
    let palette_count = header.palette_count as usize;

    let table = cursor.read(
        header.sprite_offset as u64,
        sprite_count * V2_SPRITE_RECORD_LENGTH,
    )?;

    table
        .chunks_exact(V2_SPRITE_RECORD_LENGTH)
        .enumerate()
        .map(|(index, record)| {
            let entry = finish(parse_sprite_entry(record))?;

            let Some(image_type) = ImageType::from_id(entry.image_type) else {
                return Err(SffError::MalformedDirectoryEntry { index });
            };

            // a file without palettes still stores palette index 0
            let palette_in_range = (entry.palette_index as usize) < palette_count
                || (palette_count == 0 && entry.palette_index == 0);

            if entry.link_index as usize >= sprite_count || !palette_in_range {
                return Err(SffError::MalformedDirectoryEntry { index });
            }

            if entry.data_length == 0 && entry.link_index as usize == index {
                return Err(SffError::SelfReferencingLink { index });
            }

            let base = if entry.flags == 0 {
                header.ldata_offset
            } else {
                header.tdata_offset
            };

            let data_offset = entry
                .data_offset
                .checked_add(base)
                .ok_or(SffError::MalformedDirectoryEntry { index })?;

            if !range_fits(data_offset, entry.data_length, file_length) {
                return Err(SffError::MalformedDirectoryEntry { index });
            }

            Ok(SpriteRecord {
                group: entry.group,
                number: entry.number,
                center_x: entry.center_x,
                center_y: entry.center_y,
                data_offset,
                data_length: entry.data_length,
                link_index: entry.link_index as u32,
                format: SpriteFormat::Packed {
                    width: entry.width,
                    height: entry.height,
                    image_type,
                    color_depth: entry.color_depth,
                    palette_index: entry.palette_index,
                    flags: entry.flags,
                },
            })
        })
        .collect()
}
