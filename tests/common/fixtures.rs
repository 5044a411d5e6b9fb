use super::constants::*;
use pezzottify_subscriptions::catalog::{parse_catalog_json, SqliteCatalogStore};
use pezzottify_subscriptions::config::{AppConfig, CliConfig, FileConfig};
use pezzottify_subscriptions::MusicService;
use tempfile::TempDir;

/// A [`MusicService`] over fresh databases in a temporary directory.
pub struct TestEnv {
    pub service: MusicService,
    pub config: AppConfig,
    _temp_dir: TempDir,
}

impl TestEnv {
    pub fn empty() -> Self {
        Self::with_file_config(None)
    }

    /// Databases with [`CATALOG_JSON`] imported into the catalog.
    pub fn with_catalog() -> Self {
        let env = Self::empty();
        env.import(CATALOG_JSON);
        env
    }

    pub fn with_file_config(file_config: Option<FileConfig>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            image_base_url: Some(IMAGE_BASE_URL.to_string()),
            image_bucket: None,
        };
        let config = AppConfig::resolve(&cli, file_config).expect("Failed to resolve config");
        let service = MusicService::open(&config).expect("Failed to open service");
        Self {
            service,
            config,
            _temp_dir: temp_dir,
        }
    }

    /// Writes to the catalog db the way an external catalog manager would.
    pub fn import(&self, json: &str) {
        let entries = parse_catalog_json(json).expect("Failed to parse catalog");
        SqliteCatalogStore::new(self.config.catalog_db_path(), &self.config.tables.music)
            .expect("Failed to open catalog db")
            .upsert_entries(&entries)
            .expect("Failed to import catalog");
    }

    /// Reopens the service on the same databases.
    pub fn reopen(&self) -> MusicService {
        MusicService::open(&self.config).expect("Failed to reopen service")
    }
}
