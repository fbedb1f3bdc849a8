use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::song::Song;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// `.json` files are JSON; everything else is YAML.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if ext == "json" {
            Format::Json
        } else {
            Format::Yaml
        }
    }
}

pub fn to_string(song: &Song, format: Format) -> Result<String> {
    let data = match format {
        Format::Yaml => serde_yaml::to_string(song)?,
        Format::Json => serde_json::to_string_pretty(song)?,
    };
    Ok(data)
}

pub fn from_str(data: &str, format: Format) -> Result<Song> {
    let song = match format {
        Format::Yaml => serde_yaml::from_str(data)?,
        Format::Json => serde_json::from_str(data)?,
    };
    Ok(song)
}

pub fn save(song: &Song, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let data = to_string(song, Format::from_path(path))?;
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

pub fn open(path: impl AsRef<Path>) -> Result<Song> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    from_str(&data, Format::from_path(path)).with_context(|| format!("parsing {}", path.display()))
}
