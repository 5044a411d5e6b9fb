use super::models::{strip_reserved, Attributes, CatalogEntry};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
struct CatalogFile {
    songs: Vec<RawSong>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawYear {
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
struct RawSong {
    title: String,
    artist: String,
    year: RawYear,
    #[serde(flatten)]
    extra: Attributes,
}

impl RawSong {
    fn into_entry(self) -> Result<CatalogEntry> {
        let year = match self.year {
            RawYear::Number(n) => n,
            RawYear::Text(s) => s.trim().parse().with_context(|| {
                format!(
                    "Invalid year '{}' for '{}' by '{}'",
                    s, self.title, self.artist
                )
            })?,
        };
        let mut attributes = self.extra;
        strip_reserved(&mut attributes, &self.title);
        Ok(CatalogEntry {
            title: self.title,
            artist: self.artist,
            year,
            attributes,
        })
    }
}

/// Parses a `{"songs": [...]}` catalog document.
pub fn parse_catalog_json(content: &str) -> Result<Vec<CatalogEntry>> {
    let file: CatalogFile = serde_json::from_str(content).context("Malformed catalog document")?;
    file.songs.into_iter().map(RawSong::into_entry).collect()
}

pub fn load_catalog_file(path: &Path) -> Result<Vec<CatalogEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {:?}", path))?;
    parse_catalog_json(&content).with_context(|| format!("Failed to parse catalog file: {:?}", path))
}
