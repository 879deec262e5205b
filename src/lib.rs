//! webscrape: bounded web scraping and crawling toolkit
//!
//! This crate implements single-page scraping, batch scraping, breadth-first
//! site crawling, link extraction, script-rendered scraping and screenshots.
//! Fetched content is kept in a shared, expiring resource store and callers
//! receive short previews plus `scrape://` resource references.

pub mod config;
pub mod crawler;
pub mod output;
pub mod render;
pub mod state;
pub mod store;
pub mod tools;
pub mod url;

use thiserror::Error;

/// Main error type for webscrape operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource expired: {0}")]
    Expired(String),

    #[error("Rendering unavailable: {0}")]
    RenderingUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Store error: {0}")]
    Store(store::StoreError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<store::StoreError> for ScrapeError {
    fn from(err: store::StoreError) -> Self {
        // Lookup misses keep their own kinds so callers can tell them apart
        match err {
            store::StoreError::NotFound(id) => Self::NotFound(id),
            store::StoreError::Expired(id) => Self::Expired(id),
            other => Self::Store(other),
        }
    }
}

impl From<render::RenderError> for ScrapeError {
    fn from(err: render::RenderError) -> Self {
        match err {
            render::RenderError::Unavailable(guidance) => Self::RenderingUnavailable(guidance),
            render::RenderError::Launch(message) => {
                Self::RenderingUnavailable(format!("browser failed to start: {}", message))
            }
            render::RenderError::InvalidSelector(selector) => {
                Self::InvalidInput(format!("invalid CSS selector: {}", selector))
            }
            render::RenderError::Failed { url, message } => Self::Fetch { url, message },
            render::RenderError::Timeout { url, seconds } => Self::Fetch {
                url,
                message: format!("rendering timed out after {}s", seconds),
            },
            render::RenderError::Io(e) => Self::Io(e),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for webscrape operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, CrawlJob, CrawlReport, PageRecord};
pub use output::ResponseFormat;
pub use state::PageState;
pub use store::{MemoryStore, ResourceStore, SqliteStore, StoredResource};
pub use tools::ScrapeService;
pub use url::{canonicalize, normalize_url, registrable_domain, LinkScope};
