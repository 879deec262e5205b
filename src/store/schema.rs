//! Database schema definitions for the SQLite resource store

/// SQL schema for the database
///
/// Timestamps are Unix milliseconds (UTC).
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS resources (
    scrape_id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    content BLOB NOT NULL,
    metadata TEXT NOT NULL,
    scraped_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_resources_expires ON resources(expires_at);
CREATE INDEX IF NOT EXISTS idx_resources_url ON resources(url);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - SQLite connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_resources_table_exists_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='resources'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
