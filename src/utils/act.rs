//! Adobe color table palettes.
//!
//! 256 RGB triples, optionally followed by a color count and a transparent index which are
//! ignored.
use std::{fs::OpenOptions, io::Read, path::Path};

use eyre::eyre;
use sff::Palette;

pub const ACT_PALETTE_LENGTH: usize = 768;

pub fn parse_act(bytes: &[u8]) -> eyre::Result<Palette> {
    let Some(colors) = bytes.get(..ACT_PALETTE_LENGTH) else {
        return Err(eyre!(
            "Palette is {} bytes, expected at least {ACT_PALETTE_LENGTH}",
            bytes.len()
        ));
    };

    Ok(Palette::from_rgb(
        colors.chunks_exact(3).map(|rgb| [rgb[0], rgb[1], rgb[2]]),
    ))
}

pub fn read_act_file(path: &Path) -> eyre::Result<Palette> {
    let mut file = OpenOptions::new().read(true).open(path.as_os_str())?;
    let mut bytes = vec![];

    file.read_to_end(&mut bytes)?;

    parse_act(&bytes).map_err(|err| eyre!("Cannot read palette {}: {err}", path.display()))
}
