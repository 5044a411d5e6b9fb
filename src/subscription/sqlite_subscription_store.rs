use super::models::{Subscription, SubscriptionKey};
use super::subscription_store::SubscriptionStore;
use crate::catalog::{decode_attributes, encode_attributes, CatalogEntry};
use crate::sqlite_column;
use crate::sqlite_persistence::{
    lock_connection, open_versioned, Column, SqlType, Table, TableNaming, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub const SUBSCRIPTIONS_TABLE_NAME: &str = "subscriptions";

/// V 0
const SUBSCRIPTIONS_TABLE_V_0: Table = Table {
    name: SUBSCRIPTIONS_TABLE_NAME,
    columns: &[
        sqlite_column!("email", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("music_id", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("attributes", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("email", "email")],
    unique_constraints: &[&["email", "title", "artist"]],
};

pub const SUBSCRIPTION_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[SUBSCRIPTIONS_TABLE_V_0],
    migration: None,
}];

type RawSubscription = (String, String, String, String, i64, String, i64);

fn decode_subscription(
    (email, title, artist, music_id, year, attributes, created): RawSubscription,
) -> Result<Subscription> {
    let attributes = decode_attributes(&attributes, &title)
        .with_context(|| format!("Invalid subscription row ({}, {})", email, music_id))?;
    let subscribed_at = DateTime::<Utc>::from_timestamp(created, 0)
        .with_context(|| format!("Invalid subscription timestamp {}", created))?;
    Ok(Subscription {
        email,
        music_id,
        snapshot: CatalogEntry {
            title,
            artist,
            year,
            attributes,
        },
        subscribed_at,
    })
}

#[derive(Clone)]
pub struct SqliteSubscriptionStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl SqliteSubscriptionStore {
    pub fn new<P: AsRef<Path>>(db_path: P, table: &str) -> Result<Self> {
        let naming = TableNaming::default().with(SUBSCRIPTIONS_TABLE_NAME, table)?;
        let conn = open_versioned(db_path, SUBSCRIPTION_VERSIONED_SCHEMAS, &naming)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
        })
    }
}

impl SubscriptionStore for SqliteSubscriptionStore {
    fn insert_if_absent(&self, owner_email: &str, snapshot: &CatalogEntry) -> Result<bool> {
        let music_id = snapshot.key().music_id();
        let conn = lock_connection(&self.conn)?;
        let inserted = conn
            .execute(
                &format!(
                    "INSERT INTO {} (email, title, artist, music_id, year, attributes) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                     ON CONFLICT(email, title, artist) DO NOTHING",
                    self.table
                ),
                params![
                    owner_email,
                    snapshot.title,
                    snapshot.artist,
                    music_id,
                    snapshot.year,
                    encode_attributes(&snapshot.attributes, &snapshot.title)?
                ],
            )
            .with_context(|| format!("Failed to subscribe {} to {}", owner_email, music_id))?;
        debug!(
            "insert_if_absent({}, {}) inserted {} rows",
            owner_email, music_id, inserted
        );
        Ok(inserted == 1)
    }

    fn delete(&self, key: &SubscriptionKey) -> Result<bool> {
        let conn = lock_connection(&self.conn)?;
        let deleted = conn
            .execute(
                &format!(
                    "DELETE FROM {} WHERE email = ?1 AND title = ?2 AND artist = ?3",
                    self.table
                ),
                params![key.owner_email, key.track.title, key.track.artist],
            )
            .with_context(|| {
                format!(
                    "Failed to unsubscribe {} from {}",
                    key.owner_email,
                    key.track.music_id()
                )
            })?;
        Ok(deleted > 0)
    }

    fn list_by_owner(&self, owner_email: &str) -> Result<Vec<Subscription>> {
        let conn = lock_connection(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT email, title, artist, music_id, year, attributes, created FROM {} WHERE email = ?1",
            self.table
        ))?;
        let rows = stmt
            .query_map(params![owner_email], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<Result<Vec<RawSubscription>, _>>()
            .with_context(|| format!("Failed to list subscriptions of {}", owner_email))?;
        rows.into_iter().map(decode_subscription).collect()
    }
}
