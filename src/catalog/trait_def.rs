use super::filter::CatalogFilter;
use super::models::{CatalogEntry, TrackKey};
use anyhow::Result;

/// Read-only access to the music catalog.
pub trait CatalogIndex: Send + Sync {
    /// Returns every entry matching `filter`. No ordering or paging.
    fn search(&self, filter: &CatalogFilter) -> Result<Vec<CatalogEntry>>;

    /// Point lookup by `(title, artist)`.
    /// Returns Ok(None) if the entry does not exist.
    fn get(&self, key: &TrackKey) -> Result<Option<CatalogEntry>>;
}
