use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub image_base_url: Option<String>,
    pub image_bucket: Option<String>,
    /// "argon2", or "test_fast" when built with the test-fast-hasher feature
    pub hasher: Option<String>,

    pub tables: Option<TablesConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TablesConfig {
    pub login: Option<String>,
    pub music: Option<String>,
    pub subscriptions: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
