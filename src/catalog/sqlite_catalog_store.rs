use super::filter::{CatalogFilter, FilterValue};
use super::models::{strip_reserved, Attributes, CatalogEntry, TrackKey};
use super::trait_def::CatalogIndex;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    lock_connection, open_versioned, Column, SqlType, Table, TableNaming, VersionedSchema,
};
use anyhow::{bail, Context, Result};
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub const MUSIC_TABLE_NAME: &str = "music";

/// V 0
const MUSIC_TABLE_V_0: Table = Table {
    name: MUSIC_TABLE_NAME,
    columns: &[
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("attributes", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["title", "artist"]],
};

/// V 1, artist and year lookups no longer scan the whole table.
const MUSIC_TABLE_V_1: Table = Table {
    name: MUSIC_TABLE_NAME,
    columns: MUSIC_TABLE_V_0.columns,
    indices: &[("artist", "artist"), ("year", "year")],
    unique_constraints: MUSIC_TABLE_V_0.unique_constraints,
};

pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[MUSIC_TABLE_V_0],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[MUSIC_TABLE_V_1],
        migration: Some(|conn: &Connection, naming: &TableNaming| {
            MUSIC_TABLE_V_1.create_indices(conn, naming.resolve(MUSIC_TABLE_NAME))
        }),
    },
];

/// Reserved names are dropped on the way in and on the way out, so rows
/// written by other tools cannot shadow `title`, `email` and the like.
pub(crate) fn decode_attributes(raw: &str, title: &str) -> Result<Attributes> {
    match serde_json::from_str::<serde_json::Value>(raw)
        .with_context(|| format!("Malformed attributes column: {}", raw))?
    {
        serde_json::Value::Object(mut map) => {
            strip_reserved(&mut map, title);
            Ok(map)
        }
        other => bail!("Attributes column is not a JSON object: {}", other),
    }
}

pub(crate) fn encode_attributes(attributes: &Attributes, title: &str) -> Result<String> {
    let mut attributes = attributes.clone();
    strip_reserved(&mut attributes, title);
    serde_json::to_string(&attributes).context("Failed to encode attributes")
}

type RawEntry = (String, String, i64, String);

fn raw_entry(row: &rusqlite::Row) -> rusqlite::Result<RawEntry> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode_entry((title, artist, year, attributes): RawEntry) -> Result<CatalogEntry> {
    Ok(CatalogEntry {
        attributes: decode_attributes(&attributes, &title)
            .with_context(|| format!("Invalid catalog row ({}, {})", title, artist))?,
        title,
        artist,
        year,
    })
}

#[derive(Clone)]
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl SqliteCatalogStore {
    pub fn new<P: AsRef<Path>>(db_path: P, table: &str) -> Result<Self> {
        let naming = TableNaming::default().with(MUSIC_TABLE_NAME, table)?;
        let conn = open_versioned(db_path, CATALOG_VERSIONED_SCHEMAS, &naming)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
        })
    }

    /// Inserts or replaces entries by `(title, artist)`, all or nothing.
    /// Belongs to catalog management, the core only reads through
    /// [`CatalogIndex`].
    pub fn upsert_entries(&self, entries: &[CatalogEntry]) -> Result<usize> {
        let mut conn = lock_connection(&self.conn)?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (title, artist, year, attributes) VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(title, artist) DO UPDATE SET year = excluded.year, attributes = excluded.attributes",
                self.table
            ))?;
            for entry in entries {
                stmt.execute(params![
                    entry.title,
                    entry.artist,
                    entry.year,
                    encode_attributes(&entry.attributes, &entry.title)?
                ])
                .with_context(|| {
                    format!("Failed to store catalog entry ({}, {})", entry.title, entry.artist)
                })?;
            }
        }
        tx.commit()?;
        info!("Stored {} catalog entries", entries.len());
        Ok(entries.len())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = lock_connection(&self.conn)?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}

impl CatalogIndex for SqliteCatalogStore {
    fn search(&self, filter: &CatalogFilter) -> Result<Vec<CatalogEntry>> {
        let mut clauses = Vec::with_capacity(filter.predicates().len());
        let mut values = Vec::with_capacity(filter.predicates().len());
        for (i, predicate) in filter.predicates().iter().enumerate() {
            clauses.push(format!("{} = ?{}", predicate.field.column(), i + 1));
            values.push(match &predicate.value {
                FilterValue::Text(s) => Value::Text(s.clone()),
                FilterValue::Number(n) => Value::Integer(*n),
            });
        }
        let sql = format!(
            "SELECT title, artist, year, attributes FROM {} WHERE {}",
            self.table,
            clauses.join(" AND ")
        );
        debug!("search: {}", sql);

        let conn = lock_connection(&self.conn)?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), raw_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(decode_entry).collect()
    }

    fn get(&self, key: &TrackKey) -> Result<Option<CatalogEntry>> {
        let conn = lock_connection(&self.conn)?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT title, artist, year, attributes FROM {} WHERE title = ?1 AND artist = ?2",
                    self.table
                ),
                params![key.title, key.artist],
                raw_entry,
            )
            .optional()?;
        raw.map(decode_entry).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_filter;
    use tempfile::TempDir;

    struct TestStore {
        store: SqliteCatalogStore,
        _temp_dir: TempDir,
    }

    fn create_test_store() -> TestStore {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteCatalogStore::new(temp_dir.path().join("catalog.db"), "music").unwrap();
        store
            .upsert_entries(&[
                CatalogEntry::new("Discovery", "Daft Punk", 2001)
                    .with_attribute("web_url", "https://example.com/discovery"),
                CatalogEntry::new("Homework", "Daft Punk", 1997),
                CatalogEntry::new("Play", "Moby", 1999),
                CatalogEntry::new("Californication", "Red Hot Chili Peppers", 1999),
            ])
            .unwrap();
        TestStore {
            store,
            _temp_dir: temp_dir,
        }
    }

    fn titles(mut entries: Vec<CatalogEntry>) -> Vec<String> {
        entries.sort_by(|a, b| a.title.cmp(&b.title));
        entries.into_iter().map(|e| e.title).collect()
    }

    #[test]
    fn search_by_year_only() {
        let test = create_test_store();
        let filter = build_filter(None, None, Some("1999")).unwrap();

        let results = test.store.search(&filter).unwrap();

        assert!(results.iter().all(|e| e.year == 1999 && filter.matches(e)));
        assert_eq!(titles(results), vec!["Californication", "Play"]);
    }

    #[test]
    fn search_combines_predicates_with_and() {
        let test = create_test_store();
        let filter = build_filter(None, Some("Daft Punk"), Some("1997")).unwrap();

        let results = test.store.search(&filter).unwrap();

        assert_eq!(titles(results), vec!["Homework"]);
    }

    #[test]
    fn search_is_exact_match() {
        let test = create_test_store();
        let filter = build_filter(Some("discovery"), None, None).unwrap();
        assert!(test.store.search(&filter).unwrap().is_empty());

        let filter = build_filter(None, Some("Daft"), None).unwrap();
        assert!(test.store.search(&filter).unwrap().is_empty());
    }

    #[test]
    fn get_returns_attributes() {
        let test = create_test_store();

        let entry = test
            .store
            .get(&TrackKey::new("Discovery", "Daft Punk"))
            .unwrap()
            .unwrap();

        assert_eq!(entry.year, 2001);
        assert_eq!(
            entry.attributes.get("web_url").and_then(|v| v.as_str()),
            Some("https://example.com/discovery")
        );
        assert!(test
            .store
            .get(&TrackKey::new("Discovery", "Moby"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn upsert_replaces_existing_entry() {
        let test = create_test_store();

        test.store
            .upsert_entries(&[CatalogEntry::new("Play", "Moby", 2000)])
            .unwrap();

        assert_eq!(test.store.count().unwrap(), 4);
        let entry = test.store.get(&TrackKey::new("Play", "Moby")).unwrap().unwrap();
        assert_eq!(entry.year, 2000);
    }

    #[test]
    fn reserved_attributes_never_reach_the_row() {
        let test = create_test_store();
        let forged = CatalogEntry::new("Discovery", "Daft Punk", 2001)
            .with_attribute("email", "mallory@x.com")
            .with_attribute("title", "Forged")
            .with_attribute("web_url", "https://example.com/discovery");

        test.store.upsert_entries(&[forged]).unwrap();

        let raw: String = test
            .store
            .conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT attributes FROM music WHERE title = 'Discovery'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(raw, r#"{"web_url":"https://example.com/discovery"}"#);
    }

    #[test]
    fn reserved_attributes_written_elsewhere_are_dropped_on_read() {
        let test = create_test_store();
        {
            let conn = test.store.conn.lock().unwrap();
            conn.execute(
                r#"UPDATE music SET attributes = '{"email":"mallory@x.com","title":"Forged","genre":"electronic"}' WHERE title = 'Play'"#,
                [],
            )
            .unwrap();
        }

        let entry = test.store.get(&TrackKey::new("Play", "Moby")).unwrap().unwrap();

        assert_eq!(entry.title, "Play");
        assert_eq!(entry.attributes.len(), 1);
        assert_eq!(
            entry.attributes.get("genre").and_then(|v| v.as_str()),
            Some("electronic")
        );
    }

    #[test]
    fn malformed_attributes_are_a_storage_error() {
        let test = create_test_store();
        {
            let conn = test.store.conn.lock().unwrap();
            conn.execute(
                "UPDATE music SET attributes = '[1, 2]' WHERE title = 'Play'",
                [],
            )
            .unwrap();
        }

        let result = test.store.get(&TrackKey::new("Play", "Moby"));
        assert!(format!("{:#}", result.unwrap_err()).contains("not a JSON object"));
    }

    #[test]
    fn reopens_and_migrates_v0_database() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.db");
        {
            let conn = Connection::open(&path).unwrap();
            CATALOG_VERSIONED_SCHEMAS[0]
                .create(&conn, &TableNaming::default())
                .unwrap();
            conn.execute(
                "INSERT INTO music (title, artist, year, attributes) VALUES ('Play', 'Moby', 1999, '{}')",
                [],
            )
            .unwrap();
        }

        let store = SqliteCatalogStore::new(&path, "music").unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let conn = store.conn.lock().unwrap();
        CATALOG_VERSIONED_SCHEMAS[1]
            .validate(&conn, &TableNaming::default())
            .unwrap();
    }
}
