//! Tool parameters
//!
//! Every field except the URL is optional on the wire and falls back to
//! the documented default.

use crate::crawler::{FetchMode, DEFAULT_CRAWL_DEPTH, DEFAULT_CRAWL_PAGES};
use crate::output::ResponseFormat;
use serde::{Deserialize, Serialize};

/// Largest accepted batch
pub const MAX_BATCH_URLS: usize = 20;

/// Default extra settle time for rendered scrapes
pub const DEFAULT_WAIT_SECONDS: u64 = 2;

fn default_true() -> bool {
    true
}

fn default_depth() -> u32 {
    DEFAULT_CRAWL_DEPTH
}

fn default_pages() -> usize {
    DEFAULT_CRAWL_PAGES
}

fn default_wait_seconds() -> u64 {
    DEFAULT_WAIT_SECONDS
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeUrlParams {
    pub url: String,
    #[serde(default)]
    pub response_format: ResponseFormat,
    #[serde(default)]
    pub include_links: bool,
    #[serde(default)]
    pub include_images: bool,
    #[serde(default = "default_true")]
    pub include_metadata: bool,
}

impl ScrapeUrlParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            response_format: ResponseFormat::default(),
            include_links: false,
            include_images: false,
            include_metadata: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeMultipleParams {
    /// 1 to 20 URLs, results keep this order
    pub urls: Vec<String>,
    #[serde(default)]
    pub response_format: ResponseFormat,
    #[serde(default)]
    pub include_metadata: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSiteParams {
    pub url: String,
    /// Clamped to 0..=5
    #[serde(default = "default_depth")]
    pub max_depth: u32,
    /// Clamped to 1..=100
    #[serde(default = "default_pages")]
    pub max_pages: usize,
    #[serde(default = "default_true")]
    pub same_domain_only: bool,
    #[serde(default)]
    pub response_format: ResponseFormat,
    #[serde(default)]
    pub fetch_mode: FetchMode,
    /// Overrides `crawler.crawl-timeout-secs`; 0 disables the timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl CrawlSiteParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_depth: DEFAULT_CRAWL_DEPTH,
            max_pages: DEFAULT_CRAWL_PAGES,
            same_domain_only: true,
            response_format: ResponseFormat::default(),
            fetch_mode: FetchMode::default(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractLinksParams {
    pub url: String,
    #[serde(default)]
    pub same_domain_only: bool,
    /// Keep `#fragment` variants as distinct links
    #[serde(default)]
    pub include_anchors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeWithJsParams {
    pub url: String,
    #[serde(default)]
    pub wait_for_selector: Option<String>,
    /// 0..=30
    #[serde(default = "default_wait_seconds")]
    pub wait_seconds: u64,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

impl ScrapeWithJsParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            wait_for_selector: None,
            wait_seconds: DEFAULT_WAIT_SECONDS,
            response_format: ResponseFormat::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotParams {
    pub url: String,
    #[serde(default)]
    pub full_page: bool,
    /// 320..=3840
    #[serde(default = "default_width")]
    pub width: u32,
    /// 240..=2160
    #[serde(default = "default_height")]
    pub height: u32,
}

impl ScreenshotParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            full_page: false,
            width: default_width(),
            height: default_height(),
        }
    }
}
