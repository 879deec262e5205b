//! Resource store trait and error types
//!
//! This module defines the trait interface for resource store backends and
//! associated error types.

use crate::store::{ResourceHandle, ResourceMetadata, StoredResource};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource expired: {0}")]
    Expired(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for resource store backends
///
/// A store is shared by every tool invocation, so implementations guard
/// their key-space internally and take `&self` everywhere. Stored resources
/// are never mutated after `put`.
pub trait ResourceStore: Send + Sync {
    /// Time-to-live applied to every new resource
    fn ttl(&self) -> chrono::Duration;

    /// Stores content under a freshly generated scrape id
    ///
    /// # Arguments
    ///
    /// * `content` - Content bytes, stored as given
    /// * `metadata` - Descriptive metadata returned alongside the content
    /// * `now` - Scrape timestamp; expiry is `now + ttl`
    fn put_at(
        &self,
        content: Vec<u8>,
        metadata: ResourceMetadata,
        now: DateTime<Utc>,
    ) -> StoreResult<ResourceHandle>;

    /// Stores content, stamped with the current time
    fn put(&self, content: Vec<u8>, metadata: ResourceMetadata) -> StoreResult<ResourceHandle> {
        self.put_at(content, metadata, Utc::now())
    }

    /// Looks up a resource as of `now`
    ///
    /// # Returns
    ///
    /// * `Ok(StoredResource)` - The resource exists and has not expired
    /// * `Err(StoreError::Expired)` - The resource exists but its expiry has passed
    /// * `Err(StoreError::NotFound)` - No resource has this id
    fn get_at(&self, scrape_id: &str, now: DateTime<Utc>) -> StoreResult<StoredResource>;

    /// Looks up a resource as of the current time
    fn get(&self, scrape_id: &str) -> StoreResult<StoredResource> {
        self.get_at(scrape_id, Utc::now())
    }

    /// Removes every resource whose expiry is at or before `now`
    ///
    /// Returns the number of resources removed.
    fn expire(&self, now: DateTime<Utc>) -> StoreResult<usize>;

    /// Number of resources currently held, expired ones included
    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
