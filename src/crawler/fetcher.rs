//! Page fetchers
//!
//! This module handles retrieving a single URL, including:
//! - Building HTTP clients with proper user agent strings and timeouts
//! - Static GET fetches over HTTP
//! - Script-rendered fetches through a render engine
//! - Error classification into page states

use crate::config::Config;
use crate::render::{RenderEngine, RenderError, RenderOptions};
use crate::state::PageState;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed for one request
const MAX_REDIRECTS: usize = 10;

/// How pages are retrieved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Plain HTTP GET
    #[default]
    Static,
    /// Headless browser with script execution
    Rendered,
}

impl FetchMode {
    /// Value reported as `rendering_method`
    pub fn rendering_method(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Rendered => "javascript",
        }
    }
}

/// A successfully retrieved document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL that was requested
    pub url: Url,
    /// URL after redirects; links resolve against this
    pub final_url: Url,
    /// HTTP status code, absent for rendered fetches
    pub status_code: Option<u16>,
    /// Content-Type header value
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Returns true when the body should be parsed as HTML
    ///
    /// A missing Content-Type is treated as HTML.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            }
            None => true,
        }
    }

    /// Body decoded as UTF-8, lossily
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// A failed fetch, classified into a page state
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FetchError {
    pub state: PageState,
    pub status_code: Option<u16>,
    pub message: String,
}

impl FetchError {
    pub fn new(state: PageState, message: impl Into<String>) -> Self {
        Self {
            state,
            status_code: None,
            message: message.into(),
        }
    }

    /// Failure for a non-success HTTP status
    pub fn http_status(status: reqwest::StatusCode) -> Self {
        let code = status.as_u16();
        Self {
            state: PageState::from_status(code),
            status_code: Some(code),
            message: format!(
                "HTTP {} {}",
                code,
                status.canonical_reason().unwrap_or("error")
            ),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        // Classify error
        if e.is_timeout() {
            Self::new(PageState::TimedOut, "Request timeout")
        } else if e.is_connect() {
            Self::new(PageState::Unreachable, format!("Connection failed: {}", e))
        } else if e.is_redirect() {
            Self::new(PageState::Failed, format!("Redirect error: {}", e))
        } else {
            Self::new(PageState::Failed, e.to_string())
        }
    }
}

impl From<RenderError> for FetchError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::Timeout { .. } => Self::new(PageState::TimedOut, e.to_string()),
            other => Self::new(PageState::Failed, other.to_string()),
        }
    }
}

/// Retrieves one URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn mode(&self) -> FetchMode;

    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The application configuration (user agent and timeouts)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use webscrape::config::Config;
/// use webscrape::crawler::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(config.crawler.request_timeout())
        .connect_timeout(config.crawler.connect_timeout())
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Static fetcher: a single GET, redirects followed
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn mode(&self) -> FetchMode {
        FetchMode::Static
    }

    /// Fetches a URL and classifies failures
    ///
    /// | Condition | State |
    /// |-----------|-------|
    /// | HTTP 404 / 410 | DeadLink |
    /// | HTTP 429 | RateLimited |
    /// | Other non-2xx | HttpError |
    /// | Timeout | TimedOut |
    /// | Connection refused, DNS, TLS | Unreachable |
    /// | Redirect loop or chain > 10 | Failed |
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(status));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.bytes().await?;

        Ok(FetchedPage {
            url: url.clone(),
            final_url,
            status_code: Some(status.as_u16()),
            content_type,
            body: body.to_vec(),
        })
    }
}

/// Fetcher that renders pages in a headless browser
pub struct RenderedFetcher {
    engine: Arc<dyn RenderEngine>,
    options: RenderOptions,
}

impl RenderedFetcher {
    pub fn new(engine: Arc<dyn RenderEngine>, options: RenderOptions) -> Self {
        Self { engine, options }
    }
}

#[async_trait]
impl Fetcher for RenderedFetcher {
    fn mode(&self) -> FetchMode {
        FetchMode::Rendered
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        tracing::debug!("Rendering {}", url);
        let page = self.engine.render(url, &self.options).await?;

        Ok(FetchedPage {
            url: url.clone(),
            final_url: page.url,
            status_code: None,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: page.html.into_bytes(),
        })
    }
}
