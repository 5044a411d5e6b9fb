use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

/// Offset added to `PRAGMA user_version`, so a database that was never
/// initialized by us (version 0) is not mistaken for schema version 0.
pub const BASE_DB_VERSION: usize = 99999;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                default_value: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

lazy_static! {
    static ref SQL_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
        }
    }

    fn from_sql(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            _ => None,
        }
    }
}

pub struct Column<'a, S: AsRef<str>> {
    pub name: S,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub default_value: Option<S>,
}

/// A table declaration. `name` is the declared name, the name actually used in
/// a database goes through [`TableNaming`].
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static, &'static str>],
    /// (suffix, columns). The index is created as `idx_<table>_<suffix>`.
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
}

/// Maps declared table names onto configured ones.
#[derive(Debug, Clone, Default)]
pub struct TableNaming {
    renames: Vec<(&'static str, String)>,
}

impl TableNaming {
    pub fn with<S: Into<String>>(mut self, declared: &'static str, actual: S) -> Result<Self> {
        let actual = actual.into();
        ensure_sql_identifier(&actual)?;
        self.renames.retain(|(d, _)| *d != declared);
        self.renames.push((declared, actual));
        Ok(self)
    }

    pub fn resolve<'a>(&'a self, declared: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(d, _)| *d == declared)
            .map(|(_, actual)| actual.as_str())
            .unwrap_or(declared)
    }
}

pub fn ensure_sql_identifier(name: &str) -> Result<()> {
    if !SQL_IDENTIFIER.is_match(name) {
        bail!("'{}' is not a valid table name", name);
    }
    Ok(())
}

fn index_name(table_name: &str, suffix: &str) -> String {
    format!("idx_{}_{}", table_name, suffix)
}

fn strip_parentheses(s: &str) -> &str {
    s.strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(s)
}

impl Table {
    pub fn create(&self, conn: &Connection, table_name: &str) -> Result<()> {
        let mut column_defs = Vec::with_capacity(self.columns.len());
        for column in self.columns {
            let mut def = format!("{} {}", column.name, column.sql_type.as_sql());
            if column.is_primary_key {
                def.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                def.push_str(" NOT NULL");
            }
            if let Some(default_value) = column.default_value {
                def.push_str(&format!(" DEFAULT {}", default_value));
            }
            column_defs.push(def);
        }
        for unique_constraint in self.unique_constraints {
            column_defs.push(format!("UNIQUE ({})", unique_constraint.join(", ")));
        }

        conn.execute(
            &format!("CREATE TABLE {} ({});", table_name, column_defs.join(", ")),
            params![],
        )
        .with_context(|| format!("Failed to create table {}", table_name))?;

        self.create_indices(conn, table_name)
    }

    pub fn create_indices(&self, conn: &Connection, table_name: &str) -> Result<()> {
        for (suffix, columns) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {}({});",
                    index_name(table_name, suffix),
                    table_name,
                    columns
                ),
                params![],
            )?;
        }
        Ok(())
    }

    pub fn validate(&self, conn: &Connection, table_name: &str) -> Result<()> {
        struct ActualColumn {
            name: String,
            sql_type: Option<&'static SqlType>,
            non_null: bool,
            default_value: Option<String>,
            is_primary_key: bool,
        }

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", table_name))?;
        let actual_columns = stmt
            .query_map([], |row| {
                Ok(ActualColumn {
                    name: row.get(1)?,
                    sql_type: SqlType::from_sql(&row.get::<_, String>(2)?),
                    non_null: row.get::<_, i32>(3)? == 1,
                    default_value: row.get(4)?,
                    is_primary_key: row.get::<_, i32>(5)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if actual_columns.is_empty() {
            bail!("Table {} does not exist", table_name);
        }
        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found: {}, expected: {}",
                table_name,
                actual_columns.len(),
                self.columns.len(),
                actual_columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.columns
                    .iter()
                    .map(|c| c.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    table_name,
                    expected.name,
                    actual.name
                );
            }
            if actual.sql_type != Some(expected.sql_type) {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {:?}",
                    table_name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    table_name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            if actual.default_value.as_deref().map(strip_parentheses)
                != expected.default_value.map(strip_parentheses)
            {
                bail!(
                    "Table {} column {} default value mismatch: expected {:?}, got {:?}",
                    table_name,
                    expected.name,
                    expected.default_value,
                    actual.default_value
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    table_name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
        }

        for (suffix, _) in self.indices {
            let name = index_name(table_name, suffix);
            let exists = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![name, table_name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !exists {
                bail!("Table {} is missing index '{}'", table_name, name);
            }
        }

        if !self.unique_constraints.is_empty() {
            let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", table_name))?;
            let unique_indices = stmt
                .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i32>(2)?)))?
                .filter_map(|r| r.ok())
                .filter(|(_, unique)| *unique == 1)
                .map(|(name, _)| name)
                .collect::<Vec<_>>();

            let mut unique_column_sets: Vec<Vec<String>> = Vec::new();
            for index in &unique_indices {
                let mut stmt = conn.prepare(&format!("PRAGMA index_info({})", index))?;
                let mut cols = stmt
                    .query_map([], |row| row.get::<_, String>(2))?
                    .filter_map(|r| r.ok())
                    .collect::<Vec<_>>();
                cols.sort();
                unique_column_sets.push(cols);
            }

            for expected in self.unique_constraints {
                let mut expected_sorted = expected.to_vec();
                expected_sorted.sort();
                let found = unique_column_sets
                    .iter()
                    .any(|cols| cols.iter().map(String::as_str).eq(expected_sorted.iter().copied()));
                if !found {
                    bail!(
                        "Table {} is missing unique constraint on columns ({})",
                        table_name,
                        expected.join(", ")
                    );
                }
            }
        }

        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection, &TableNaming) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection, naming: &TableNaming) -> Result<()> {
        for table in self.tables {
            table.create(conn, naming.resolve(table.name))?;
        }
        set_schema_version(conn, self.version)
    }

    pub fn validate(&self, conn: &Connection, naming: &TableNaming) -> Result<()> {
        for table in self.tables {
            table.validate(conn, naming.resolve(table.name))?;
        }
        Ok(())
    }
}

fn set_schema_version(conn: &Connection, version: usize) -> Result<()> {
    conn.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + version),
        [],
    )?;
    Ok(())
}

/// Opens (or creates) a SQLite database whose layout is described by
/// `schemas`, validating and migrating an existing file to the last version.
pub fn open_versioned<P: AsRef<Path>>(
    db_path: P,
    schemas: &[VersionedSchema],
    naming: &TableNaming,
) -> Result<Connection> {
    let path = db_path.as_ref();
    let latest = schemas.last().context("No schema declared")?;
    let is_new_db = !path.exists();

    let mut conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {:?}", path))?;

    if is_new_db {
        info!("Creating new database at {:?}", path);
        latest.create(&conn, naming)?;
        return Ok(conn);
    }

    let raw_version: i64 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .context("Failed to read database version")?;
    let db_version = raw_version - BASE_DB_VERSION as i64;
    if db_version < 0 {
        bail!(
            "Database {:?} has version {}, it was not created by this program",
            path,
            raw_version
        );
    }
    if db_version > latest.version as i64 {
        bail!("Database version {} is too new", db_version);
    }
    let version = db_version as usize;

    schemas
        .iter()
        .find(|s| s.version == version)
        .with_context(|| format!("Unknown database version {}", version))?
        .validate(&conn, naming)
        .with_context(|| format!("Schema validation failed for version {}", version))?;

    if version < latest.version {
        migrate(&mut conn, schemas, version, naming)?;
    }
    Ok(conn)
}

fn migrate(
    conn: &mut Connection,
    schemas: &[VersionedSchema],
    from_version: usize,
    naming: &TableNaming,
) -> Result<()> {
    let tx = conn.transaction()?;
    let mut latest_from = from_version;
    for schema in schemas.iter().filter(|s| s.version > from_version) {
        info!(
            "Migrating db from version {} to {}",
            latest_from, schema.version
        );
        if let Some(migration_fn) = schema.migration {
            migration_fn(&tx, naming)
                .with_context(|| format!("Failed to run migration to version {}", schema.version))?;
        }
        latest_from = schema.version;
    }
    set_schema_version(&tx, latest_from)?;
    tx.commit()?;
    Ok(())
}
