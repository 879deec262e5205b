//! SQLite resource store
//!
//! This module provides a SQLite-based implementation of the ResourceStore trait.

use crate::store::schema::initialize_schema;
use crate::store::traits::{ResourceStore, StoreError, StoreResult};
use crate::store::{generate_scrape_id, ResourceHandle, ResourceMetadata, StoredResource};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite store backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
    ttl: chrono::Duration,
}

impl SqliteStore {
    /// Opens or creates a store database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `ttl` - Lifetime applied to new resources
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn new(path: &Path, ttl: chrono::Duration) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            ttl,
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory(ttl: chrono::Duration) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            ttl,
        })
    }
}

fn from_millis(ms: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StoreError::Database(format!("invalid timestamp: {}", ms)))
}

impl ResourceStore for SqliteStore {
    fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    fn put_at(
        &self,
        content: Vec<u8>,
        metadata: ResourceMetadata,
        now: DateTime<Utc>,
    ) -> StoreResult<ResourceHandle> {
        let metadata_json = serde_json::to_string(&metadata)?;
        let expires_at = now + self.ttl;
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

        // Retry on primary key collision
        loop {
            let scrape_id = generate_scrape_id();
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO resources
                    (scrape_id, url, content, metadata, scraped_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    scrape_id,
                    metadata.url,
                    content,
                    metadata_json,
                    now.timestamp_millis(),
                    expires_at.timestamp_millis()
                ],
            )?;

            if inserted == 1 {
                return Ok(ResourceHandle {
                    scrape_id,
                    scraped_at: from_millis(now.timestamp_millis())?,
                    expires_at: from_millis(expires_at.timestamp_millis())?,
                });
            }
        }
    }

    fn get_at(&self, scrape_id: &str, now: DateTime<Utc>) -> StoreResult<StoredResource> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let row = conn
            .query_row(
                "SELECT content, metadata, scraped_at, expires_at
                 FROM resources WHERE scrape_id = ?1",
                params![scrape_id],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let (content, metadata_json, scraped_at, expires_at) =
            row.ok_or_else(|| StoreError::NotFound(scrape_id.to_string()))?;

        let resource = StoredResource {
            scrape_id: scrape_id.to_string(),
            content,
            metadata: serde_json::from_str(&metadata_json)?,
            scraped_at: from_millis(scraped_at)?,
            expires_at: from_millis(expires_at)?,
        };

        if resource.is_expired_at(now) {
            return Err(StoreError::Expired(scrape_id.to_string()));
        }
        Ok(resource)
    }

    fn expire(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let swept = conn.execute(
            "DELETE FROM resources WHERE expires_at <= ?1",
            params![now.timestamp_millis()],
        )?;
        Ok(swept)
    }

    fn len(&self) -> StoreResult<usize> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM resources", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
