use super::user_models::IdentityRecord;
use super::user_store::CredentialStore;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    lock_connection, open_versioned, Column, SqlType, Table, TableNaming, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub const LOGIN_TABLE_NAME: &str = "login";

/// V 0
const LOGIN_TABLE_V_0: Table = Table {
    name: LOGIN_TABLE_NAME,
    columns: &[
        sqlite_column!(
            "email",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true
        ),
        sqlite_column!("username", &SqlType::Text, non_null = true),
        sqlite_column!("password_hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[LOGIN_TABLE_V_0],
    migration: None,
}];

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl SqliteUserStore {
    pub fn new<P: AsRef<Path>>(db_path: P, table: &str) -> Result<Self> {
        let naming = TableNaming::default().with(LOGIN_TABLE_NAME, table)?;
        let conn = open_versioned(db_path, USER_VERSIONED_SCHEMAS, &naming)?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
        })
    }
}

impl CredentialStore for SqliteUserStore {
    fn get_identity(&self, email: &str) -> Result<Option<IdentityRecord>> {
        let conn = lock_connection(&self.conn)?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT email, username, password_hash, hasher FROM {} WHERE email = ?1",
                    self.table
                ),
                params![email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .with_context(|| format!("Failed to read identity {}", email))?;

        row.map(|(email, username, password_hash, hasher)| {
            Ok(IdentityRecord {
                hasher: hasher
                    .parse()
                    .with_context(|| format!("Invalid hasher for identity {}", email))?,
                email,
                username,
                password_hash,
            })
        })
        .transpose()
    }

    fn insert_identity_if_absent(&self, record: &IdentityRecord) -> Result<bool> {
        let conn = lock_connection(&self.conn)?;
        let inserted = conn
            .execute(
                &format!(
                    "INSERT INTO {} (email, username, password_hash, hasher) VALUES (?1, ?2, ?3, ?4) \
                     ON CONFLICT(email) DO NOTHING",
                    self.table
                ),
                params![
                    record.email,
                    record.username,
                    record.password_hash,
                    record.hasher.to_string()
                ],
            )
            .with_context(|| format!("Failed to create identity {}", record.email))?;
        debug!(
            "insert_identity_if_absent({}) inserted {} rows",
            record.email, inserted
        );
        Ok(inserted == 1)
    }
}
