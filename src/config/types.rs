use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for webscrape
///
/// Every section is optional; a missing file section falls back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub store: StoreConfig,
    pub renderer: RendererConfig,
}

/// Crawler and fetcher behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    pub workers: u32,

    /// Timeout for a single HTTP request (seconds)
    pub request_timeout_secs: u64,

    /// Timeout for establishing a connection (seconds)
    pub connect_timeout_secs: u64,

    /// Crawl-wide timeout after which no new pages are dispatched (0 disables)
    pub crawl_timeout_secs: u64,
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Crawl-wide timeout, if one is configured
    pub fn crawl_timeout(&self) -> Option<Duration> {
        (self.crawl_timeout_secs > 0).then(|| Duration::from_secs(self.crawl_timeout_secs))
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            crawl_timeout_secs: 0,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "webscrape".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

/// Resource store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StoreConfig {
    /// Lifetime of a stored resource (seconds)
    pub ttl_seconds: u64,

    /// Number of characters returned as a content preview
    pub preview_length: usize,

    /// Interval between background expiry sweeps (seconds)
    pub sweep_interval_secs: u64,

    /// SQLite database file; the in-memory store is used when unset
    pub database_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_seconds as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            preview_length: 500,
            sweep_interval_secs: 300,
            database_path: None,
        }
    }
}

/// Headless browser configuration for rendered scrapes and screenshots
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RendererConfig {
    /// Set to false to report rendering as unavailable without probing
    pub enabled: bool,

    /// Explicit path to a Chrome/Chromium executable
    pub chrome_path: Option<PathBuf>,

    /// Upper bound on a single browser invocation (seconds)
    pub timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chrome_path: None,
            timeout_secs: 60,
        }
    }
}
