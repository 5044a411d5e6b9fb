mod filter;
mod load;
mod models;
mod sqlite_catalog_store;
mod trait_def;

pub use filter::{build_filter, CatalogField, CatalogFilter, FilterValue, Predicate};
pub use load::{load_catalog_file, parse_catalog_json};
pub use models::{Attributes, CatalogEntry, ResolvedEntry, TrackKey};
pub use sqlite_catalog_store::{SqliteCatalogStore, CATALOG_VERSIONED_SCHEMAS, MUSIC_TABLE_NAME};
pub(crate) use sqlite_catalog_store::{decode_attributes, encode_attributes};
pub use trait_def::CatalogIndex;
