//! Resource store for scraped content
//!
//! Fetched pages and screenshots are kept here under a generated scrape id
//! and handed to callers as `scrape://` resource URIs. Every resource
//! expires after the configured TTL; a background sweeper removes expired
//! entries periodically.
//!
//! Two backends implement [`ResourceStore`]:
//! - `MemoryStore`: process-local map (default)
//! - `SqliteStore`: SQLite file, survives restarts

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{ResourceStore, StoreError, StoreResult};

use crate::config::StoreConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// URI scheme used for resource references
pub const RESOURCE_SCHEME: &str = "scrape";

/// Descriptive metadata stored next to the content bytes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    /// URL the content was fetched from
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Response format (`markdown`, `html`, `text`, `json`) or `png` for screenshots
    pub format: String,
    pub mime_type: String,
    pub status_code: Option<u16>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Byte length of the stored content
    pub content_length: usize,
    /// `static` or `javascript`
    pub rendering_method: Option<String>,
}

/// Receipt returned by a successful `put`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    pub scrape_id: String,
    pub scraped_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ResourceHandle {
    pub fn content_uri(&self) -> String {
        ResourceUri::Content(self.scrape_id.clone()).to_string()
    }

    pub fn metadata_uri(&self) -> String {
        ResourceUri::Metadata(self.scrape_id.clone()).to_string()
    }
}

/// A resource as held by the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResource {
    pub scrape_id: String,
    pub content: Vec<u8>,
    pub metadata: ResourceMetadata,
    pub scraped_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredResource {
    /// Returns true once `now` has reached the expiry time
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Content decoded as UTF-8, lossily
    pub fn content_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Metadata view served for `scrape://{id}/metadata`
    pub fn metadata_json(&self) -> serde_json::Value {
        serde_json::json!({
            "scrape_id": self.scrape_id,
            "url": self.metadata.url,
            "title": self.metadata.title,
            "description": self.metadata.description,
            "format": self.metadata.format,
            "mime_type": self.metadata.mime_type,
            "status_code": self.metadata.status_code,
            "content_length": self.metadata.content_length,
            "rendering_method": self.metadata.rendering_method,
            "links": self.metadata.links,
            "images": self.metadata.images,
            "scraped_at": self.scraped_at.to_rfc3339(),
            "expires_at": self.expires_at.to_rfc3339(),
        })
    }
}

/// Generates a new scrape id (UUID v4, hyphen-free hex)
pub fn generate_scrape_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// A parsed `scrape://{id}/content` or `scrape://{id}/metadata` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceUri {
    Content(String),
    Metadata(String),
}

impl ResourceUri {
    /// Parses a resource URI
    ///
    /// # Examples
    ///
    /// ```
    /// use webscrape::store::ResourceUri;
    ///
    /// let uri = ResourceUri::parse("scrape://abc123/metadata").unwrap();
    /// assert_eq!(uri, ResourceUri::Metadata("abc123".to_string()));
    /// assert!(ResourceUri::parse("https://example.com/").is_none());
    /// ```
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.trim().strip_prefix("scrape://")?;
        let (id, kind) = rest.split_once('/')?;
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        match kind {
            "content" => Some(Self::Content(id.to_string())),
            "metadata" => Some(Self::Metadata(id.to_string())),
            _ => None,
        }
    }

    pub fn scrape_id(&self) -> &str {
        match self {
            Self::Content(id) | Self::Metadata(id) => id,
        }
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content(id) => write!(f, "{}://{}/content", RESOURCE_SCHEME, id),
            Self::Metadata(id) => write!(f, "{}://{}/metadata", RESOURCE_SCHEME, id),
        }
    }
}

/// Opens the store backend selected by the configuration
///
/// # Arguments
///
/// * `config` - Store section of the configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn ResourceStore>)` - SQLite store if `database-path` is set, memory store otherwise
/// * `Err(StoreError)` - Failed to open the database
pub fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn ResourceStore>> {
    match &config.database_path {
        Some(path) => {
            tracing::info!("Opening SQLite resource store at {}", path.display());
            Ok(Arc::new(SqliteStore::new(path, config.ttl())?))
        }
        None => {
            tracing::debug!("Using in-memory resource store");
            Ok(Arc::new(MemoryStore::new(config.ttl())))
        }
    }
}

/// Spawns a task that calls `expire(now)` every `interval`
///
/// The task runs until `shutdown` is cancelled. Sweep failures are logged
/// and the next tick tries again.
pub fn spawn_expiry_sweeper(
    store: Arc<dyn ResourceStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("Expiry sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match store.expire(Utc::now()) {
                        Ok(0) => {}
                        Ok(swept) => tracing::debug!("Swept {} expired resources", swept),
                        Err(e) => tracing::warn!("Expiry sweep failed: {}", e),
                    }
                }
            }
        }
    })
}
