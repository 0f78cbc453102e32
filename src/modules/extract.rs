//! Decodes every sprite of an archive in parallel.
//!
//! Each worker opens its own handle since reads on one handle are sequential.
use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::eyre;
use image::RgbaImage;
use rayon::prelude::*;
use sff::{Palette, Sff};

use crate::{config::ExtractConfig, utils::act::read_act_file};

pub struct ExtractedSprite {
    pub index: usize,
    pub group: u16,
    pub number: u16,
    pub center: (i16, i16),
    pub image: RgbaImage,
}

impl ExtractedSprite {
    pub fn file_name(&self) -> String {
        format!("{}_{}.png", self.group, self.number)
    }
}

/// Record indexes to extract, in file order.
fn work_items(sff: &Sff<fs::File>, groups: Option<&[u16]>) -> Vec<usize> {
    match groups {
        Some(groups) => {
            let mut res: Vec<usize> = groups
                .iter()
                .flat_map(|group| sff.indexes_in_group(*group).iter().copied())
                .collect();

            res.sort_unstable();
            res.dedup();
            res
        }
        None => (0..sff.image_count()).collect(),
    }
}

fn extract_all(
    path: &Path,
    sff: &Sff<fs::File>,
    items: Vec<usize>,
    palette: Option<&Palette>,
) -> Vec<(usize, eyre::Result<ExtractedSprite>)> {
    items
        .into_par_iter()
        .map_init(
            || Sff::open_from_file(path),
            |handle, index| {
                let res = handle
                    .as_mut()
                    .map_err(|err| eyre!("Cannot open {}: {err}", path.display()))
                    .and_then(|worker| -> eyre::Result<ExtractedSprite> {
                        let image = match palette {
                            Some(palette) => worker.decode_with_palette(index, palette),
                            None => worker.decode(index),
                        }?;

                        let sprite = sff
                            .sprite(index)
                            .ok_or_else(|| eyre!("Sprite {index} does not exist"))?;

                        Ok(ExtractedSprite {
                            index,
                            group: sprite.group,
                            number: sprite.number,
                            center: (sprite.center_x, sprite.center_y),
                            image,
                        })
                    });

                (index, res)
            },
        )
        .collect()
}

/// Decodes the sprites of the archive at `path` selected by `config`.
pub fn extract(path: &Path, config: &ExtractConfig) -> eyre::Result<Vec<ExtractedSprite>> {
    let sff = Sff::open_from_file(path)
        .map_err(|err| eyre!("Cannot open {}: {err}", path.display()))?;

    let palette = config
        .palette
        .as_deref()
        .map(read_act_file)
        .transpose()?;

    let items = work_items(&sff, config.groups.as_deref());

    log::debug!(
        "extracting {} of {} sprites from {}",
        items.len(),
        sff.image_count(),
        path.display()
    );

    let results = match config.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(|| extract_all(path, &sff, items, palette.as_ref())),
        None => extract_all(path, &sff, items, palette.as_ref()),
    };

    let mut sprites = Vec::with_capacity(results.len());

    for (index, res) in results {
        match res {
            Ok(sprite) => sprites.push(sprite),
            Err(err) if config.skip_errors => {
                log::warn!("Skipping sprite {index} of {}: {err}", path.display());
            }
            Err(err) => return Err(eyre!("Sprite {index} of {}: {err}", path.display())),
        }
    }

    Ok(sprites)
}

/// Extracts into `out_dir` as `<group>_<number>.png` and returns the written files.
pub fn extract_to_folder(
    path: &Path,
    out_dir: &Path,
    config: &ExtractConfig,
) -> eyre::Result<Vec<PathBuf>> {
    let sprites = extract(path, config)?;

    fs::create_dir_all(out_dir)?;

    sprites
        .par_iter()
        .map(|sprite| -> eyre::Result<PathBuf> {
            let out_path = out_dir.join(sprite.file_name());

            sprite
                .image
                .save(&out_path)
                .map_err(|err| eyre!("Cannot write {}: {err}", out_path.display()))?;

            Ok(out_path)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use std::env;

    use byte_writer::ByteWriter;
    use image::Rgba;

    use super::*;

    fn palette_bytes() -> Vec<u8> {
        (0..=255u8).flat_map(|i| [i, i, 0]).collect()
    }

    // (group, number, image type, color index) of 1x1 images sharing one four color palette
    fn archive(sprites: &[(u16, u16, u8, u8)]) -> Vec<u8> {
        let mut writer = ByteWriter::new();

        writer.append_u8_slice(b"ElecbyteSpr\0");
        writer.append_u8_slice(&[0, 0, 0, 2]);
        writer.pad_to(16 + 52);

        let palette_offset = writer.get_offset();
        writer.append_u16(0);
        writer.append_u16(0);
        writer.append_u16(4);
        writer.append_u16(0);
        writer.append_u32(0);
        writer.append_u32(16);

        let sprite_offset = writer.get_offset();
        for (i, (group, number, image_type, _)) in sprites.iter().enumerate() {
            writer.append_u16(*group);
            writer.append_u16(*number);
            writer.append_u16(1);
            writer.append_u16(1);
            writer.append_i16(0);
            writer.append_i16(0);
            writer.append_u16(0);
            writer.append_u8(*image_type);
            writer.append_u8(8);
            writer.append_u32(16 + i as u32);
            writer.append_u32(1);
            writer.append_u16(0);
            writer.append_u16(0);
        }

        let ldata_offset = writer.get_offset();
        writer.append_u8_slice(&[0, 0, 0, 0, 200, 0, 0, 0, 0, 200, 0, 0, 0, 0, 200, 0]);
        sprites
            .iter()
            .for_each(|(_, _, _, color_index)| writer.append_u8(*color_index));

        writer.replace_with_u32(36, sprite_offset as u32);
        writer.replace_with_u32(40, sprites.len() as u32);
        writer.replace_with_u32(44, palette_offset as u32);
        writer.replace_with_u32(48, 1);
        writer.replace_with_u32(52, ldata_offset as u32);
        writer.replace_with_u32(56, 16 + sprites.len() as u32);
        let end = writer.get_offset() as u32;
        writer.replace_with_u32(60, end);

        writer.data
    }

    fn write_archive(name: &str, sprites: &[(u16, u16, u8, u8)]) -> PathBuf {
        let root = env::temp_dir().join(format!("sffkit_extract_{name}"));
        fs::create_dir_all(&root).unwrap();

        let path = root.join("chars.sff");
        fs::write(&path, archive(sprites)).unwrap();

        path
    }

    #[test]
    fn extract_every_sprite() {
        let path = write_archive("every", &[(0, 0, 0, 1), (0, 1, 0, 2), (5, 0, 0, 3)]);

        let sprites = extract(&path, &ExtractConfig::default()).unwrap();

        assert_eq!(sprites.len(), 3);
        assert_eq!(
            sprites.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(sprites[0].image.get_pixel(0, 0), &Rgba([200, 0, 0, 255]));
        assert_eq!(sprites[2].image.get_pixel(0, 0), &Rgba([0, 0, 200, 255]));
        assert_eq!(sprites[2].file_name(), "5_0.png");

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn extract_groups_with_one_thread() {
        let path = write_archive("groups", &[(0, 0, 0, 1), (5, 0, 0, 2), (5, 1, 0, 3)]);

        let config = ExtractConfig {
            groups: Some(vec![5]),
            threads: Some(1),
            ..Default::default()
        };

        let sprites = extract(&path, &config).unwrap();

        assert_eq!(
            sprites
                .iter()
                .map(|s| (s.group, s.number))
                .collect::<Vec<_>>(),
            vec![(5, 0), (5, 1)]
        );

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn failing_sprites() {
        // rle5 is not decoded
        let path = write_archive("failing", &[(0, 0, 0, 1), (0, 1, 3, 1)]);

        let sprites = extract(&path, &ExtractConfig::default()).unwrap();
        assert_eq!(sprites.len(), 1);
        assert_eq!(sprites[0].index, 0);

        let config = ExtractConfig {
            skip_errors: false,
            ..Default::default()
        };
        assert!(extract(&path, &config).is_err());

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn palette_override() {
        let path = write_archive("palette", &[(0, 0, 0, 7)]);
        let act = path.with_file_name("gray.act");
        fs::write(&act, palette_bytes()).unwrap();

        let config = ExtractConfig {
            palette: Some(act),
            ..Default::default()
        };

        let sprites = extract(&path, &config).unwrap();
        assert_eq!(sprites[0].image.get_pixel(0, 0), &Rgba([7, 7, 0, 255]));

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn write_pngs() {
        let path = write_archive("folder", &[(1, 2, 0, 1)]);
        let out_dir = path.with_file_name("out");

        let written = extract_to_folder(&path, &out_dir, &ExtractConfig::default()).unwrap();

        assert_eq!(written, vec![out_dir.join("1_2.png")]);
        assert_eq!(
            image::open(&written[0]).unwrap().to_rgba8().get_pixel(0, 0),
            &Rgba([200, 0, 0, 255])
        );

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn missing_archive() {
        assert!(extract(Path::new("/nonexistent/chars.sff"), &ExtractConfig::default()).is_err());
    }
}
