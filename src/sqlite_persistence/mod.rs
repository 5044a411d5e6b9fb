mod versioned_schema;

pub use versioned_schema::{
    ensure_sql_identifier, open_versioned, Column, SqlType, Table, TableNaming, VersionedSchema,
    BASE_DB_VERSION, DEFAULT_TIMESTAMP,
};

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

pub fn lock_connection(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| anyhow!("Database connection mutex was poisoned"))
}
