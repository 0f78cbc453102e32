//! Parses extraction config file
use std::{
    fs::OpenOptions,
    io::Read,
    path::{Path, PathBuf},
};

use eyre::eyre;
use serde::Deserialize;

pub static CONFIG_FILE_NAME: &str = "sffkit.toml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ExtractConfig {
    /// ACT palette used for every indexed image instead of the stored one.
    pub palette: Option<PathBuf>,
    /// Only extract these sprite groups.
    pub groups: Option<Vec<u16>>,
    /// Log and skip sprites that fail to decode instead of failing the whole archive.
    #[serde(default = "default_skip_errors")]
    pub skip_errors: bool,
    /// Worker count, rayon decides when missing.
    pub threads: Option<usize>,
}

fn default_skip_errors() -> bool {
    true
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            palette: None,
            groups: None,
            skip_errors: default_skip_errors(),
            threads: None,
        }
    }
}

pub fn parse_config_from_str(s: &str) -> eyre::Result<ExtractConfig> {
    let config: ExtractConfig = toml::from_str(s)?;

    if config.threads == Some(0) {
        return Err(eyre!("Thread count must be at least 1"));
    }

    Ok(config)
}

/// Relative palette paths are resolved from the folder of the config file.
pub fn parse_config_from_file(path: &Path) -> eyre::Result<ExtractConfig> {
    let mut file = OpenOptions::new().read(true).open(path.as_os_str())?;
    let mut buffer = String::new();

    file.read_to_string(&mut buffer)?;

    let mut config = parse_config_from_str(&buffer)?;

    if let Some(palette) = config.palette.take() {
        let palette = match path.parent() {
            Some(root) if palette.is_relative() => root.join(palette),
            _ => palette,
        };

        if !palette.exists() {
            return Err(eyre!("Cannot find palette file {}", palette.display()));
        }

        config.palette = Some(palette);
    }

    Ok(config)
}
