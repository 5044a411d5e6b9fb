//! Entry points of the subscription core.
//!
//! [`MusicService`] holds no per-user state: owner-scoped calls take the
//! caller's [`Identity`] explicitly and the rest lives in the stores.

use crate::catalog::{self, CatalogFilter, CatalogIndex, ResolvedEntry, SqliteCatalogStore};
use crate::config::AppConfig;
use crate::error::CoreResult;
use crate::image::ImageLocator;
use crate::subscription::{
    SqliteSubscriptionStore, SubscribedTrack, SubscriptionLedger, SubscriptionStore,
};
use crate::user::{CredentialStore, Identity, SqliteUserStore, UserManager};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const NO_RESULTS_MESSAGE: &str = "No results found. Please try again.";
pub const SUBSCRIBED_MESSAGE: &str = "Music subscribed successfully!";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    Results { entries: Vec<ResolvedEntry> },
    NoResults { message: &'static str },
}

pub struct MusicService {
    users: UserManager,
    catalog: Arc<dyn CatalogIndex>,
    ledger: SubscriptionLedger,
    images: ImageLocator,
}

impl MusicService {
    pub fn new(
        user_store: Arc<dyn CredentialStore>,
        catalog: Arc<dyn CatalogIndex>,
        subscription_store: Arc<dyn SubscriptionStore>,
        images: ImageLocator,
        config: &AppConfig,
    ) -> CoreResult<Self> {
        Ok(Self {
            users: UserManager::new(user_store, config.hasher)?,
            ledger: SubscriptionLedger::new(catalog.clone(), subscription_store, images.clone()),
            catalog,
            images,
        })
    }

    /// Opens (creating if needed) the three databases under `config.db_dir`.
    pub fn open(config: &AppConfig) -> CoreResult<Self> {
        let user_store = SqliteUserStore::new(config.user_db_path(), &config.tables.login)
            .context("Failed to open user db")?;
        let catalog_store = SqliteCatalogStore::new(config.catalog_db_path(), &config.tables.music)
            .context("Failed to open catalog db")?;
        let subscription_store = SqliteSubscriptionStore::new(
            config.subscriptions_db_path(),
            &config.tables.subscriptions,
        )
        .context("Failed to open subscriptions db")?;
        info!("Opened databases in {:?}", config.db_dir);

        Self::new(
            Arc::new(user_store),
            Arc::new(catalog_store),
            Arc::new(subscription_store),
            ImageLocator::new(&config.image_base_url),
            config,
        )
    }

    pub fn register(&self, email: &str, username: &str, password: &str) -> CoreResult<Identity> {
        self.users.register(email, username, password)
    }

    pub fn authenticate(&self, email: &str, password: &str) -> CoreResult<Identity> {
        self.users.authenticate(email, password)
    }

    pub fn build_filter(
        &self,
        title: Option<&str>,
        artist: Option<&str>,
        year: Option<&str>,
    ) -> CoreResult<CatalogFilter> {
        Ok(catalog::build_filter(title, artist, year)?)
    }

    pub fn search_catalog(&self, filter: &CatalogFilter) -> CoreResult<Vec<ResolvedEntry>> {
        let entries = self.catalog.search(filter)?;
        debug!("search_catalog: {} entries", entries.len());
        Ok(entries
            .into_iter()
            .map(|entry| ResolvedEntry {
                img_url: self.images.image_url(&entry.artist),
                entry,
            })
            .collect())
    }

    /// [`Self::build_filter`] then [`Self::search_catalog`]. An empty result is
    /// [`QueryOutcome::NoResults`], not an error.
    pub fn query_music(
        &self,
        title: Option<&str>,
        artist: Option<&str>,
        year: Option<&str>,
    ) -> CoreResult<QueryOutcome> {
        let filter = self.build_filter(title, artist, year)?;
        let entries = self.search_catalog(&filter)?;
        if entries.is_empty() {
            return Ok(QueryOutcome::NoResults {
                message: NO_RESULTS_MESSAGE,
            });
        }
        Ok(QueryOutcome::Results { entries })
    }

    pub fn subscribe(
        &self,
        identity: &Identity,
        title: &str,
        artist: &str,
    ) -> CoreResult<Vec<SubscribedTrack>> {
        self.ledger.subscribe(&identity.email, title, artist)
    }

    pub fn unsubscribe(&self, identity: &Identity, title: &str, artist: &str) -> CoreResult<()> {
        self.ledger.unsubscribe(&identity.email, title, artist)
    }

    pub fn list_subscriptions(&self, identity: &Identity) -> CoreResult<Vec<SubscribedTrack>> {
        self.ledger.list(&identity.email)
    }

    pub fn image_url(&self, artist: &str) -> String {
        self.images.image_url(artist)
    }
}
