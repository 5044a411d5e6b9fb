mod file_config;

pub use file_config::{FileConfig, TablesConfig};

use crate::catalog::MUSIC_TABLE_NAME;
use crate::image::{bucket_base_url, DEFAULT_IMAGE_BUCKET};
use crate::sqlite_persistence::ensure_sql_identifier;
use crate::subscription::SUBSCRIPTIONS_TABLE_NAME;
use crate::user::{CredentialHasher, LOGIN_TABLE_NAME};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;

pub const USER_DB_FILE_NAME: &str = "user.db";
pub const CATALOG_DB_FILE_NAME: &str = "catalog.db";
pub const SUBSCRIPTIONS_DB_FILE_NAME: &str = "subscriptions.db";

/// CLI arguments that can be used for config resolution.
/// Every field can be overridden by the TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub image_base_url: Option<String>,
    pub image_bucket: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub login: String,
    pub music: String,
    pub subscriptions: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            login: LOGIN_TABLE_NAME.to_string(),
            music: MUSIC_TABLE_NAME.to_string(),
            subscriptions: SUBSCRIPTIONS_TABLE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub image_base_url: String,
    pub hasher: CredentialHasher,
    pub tables: TableNames,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        // An explicit base URL wins over a bucket name.
        let image_base_url = match file
            .image_base_url
            .or_else(|| cli.image_base_url.clone())
        {
            Some(url) => url,
            None => bucket_base_url(
                file.image_bucket
                    .as_deref()
                    .or(cli.image_bucket.as_deref())
                    .unwrap_or(DEFAULT_IMAGE_BUCKET),
            ),
        };
        if image_base_url.is_empty() {
            bail!("image_base_url cannot be empty");
        }

        let hasher = match file.hasher {
            Some(name) => name
                .parse::<CredentialHasher>()
                .with_context(|| format!("Invalid hasher in config file: {}", name))?,
            None => CredentialHasher::default(),
        };

        let tables_file = file.tables.unwrap_or_default();
        let defaults = TableNames::default();
        let tables = TableNames {
            login: tables_file.login.unwrap_or(defaults.login),
            music: tables_file.music.unwrap_or(defaults.music),
            subscriptions: tables_file.subscriptions.unwrap_or(defaults.subscriptions),
        };
        for name in [&tables.login, &tables.music, &tables.subscriptions] {
            ensure_sql_identifier(name)?;
        }

        Ok(Self {
            db_dir,
            image_base_url,
            hasher,
            tables,
        })
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join(USER_DB_FILE_NAME)
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join(CATALOG_DB_FILE_NAME)
    }

    pub fn subscriptions_db_path(&self) -> PathBuf {
        self.db_dir.join(SUBSCRIPTIONS_DB_FILE_NAME)
    }
}
