//! Script-rendered fetching and screenshots
//!
//! Rendering is a capability: the tool service holds one
//! `Arc<dyn RenderEngine>`, either a `ChromeRenderer` driving a local
//! headless Chrome/Chromium through `chromiumoxide` or an
//! `UnavailableRenderer` that reports how to enable rendering.

mod chrome;

pub use chrome::{find_browser_executable, ChromeRenderer};

use crate::config::RendererConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Viewport width bounds in pixels
pub const MIN_VIEWPORT_WIDTH: u32 = 320;
pub const MAX_VIEWPORT_WIDTH: u32 = 3840;

/// Viewport height bounds in pixels
pub const MIN_VIEWPORT_HEIGHT: u32 = 240;
pub const MAX_VIEWPORT_HEIGHT: u32 = 2160;

/// Upper bound on the extra settle time of a rendered fetch
pub const MAX_WAIT_SECONDS: u64 = 30;

/// Installation hint returned when no browser can be used
pub const INSTALL_GUIDANCE: &str = "No Chrome/Chromium executable found. Install Chromium \
(e.g. `apt install chromium` or `brew install --cask chromium`), then set CHROMIUM_PATH \
or `[renderer] chrome-path` if it is not on a standard path.";

/// Errors produced by a render engine
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Rendering unavailable: {0}")]
    Unavailable(String),

    #[error("Browser failed to start: {0}")]
    Launch(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Rendering failed for {url}: {message}")]
    Failed { url: String, message: String },

    #[error("Rendering {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for a script-rendered fetch
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// CSS selector to wait for before the DOM is read
    pub wait_for_selector: Option<String>,

    /// Extra seconds to let scripts run (0..=30)
    pub wait_seconds: u64,
}

/// Options for a screenshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenshotOptions {
    pub width: u32,
    pub height: u32,
    pub full_page: bool,
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            full_page: false,
        }
    }
}

/// Document produced by a rendered fetch
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: Url,
    /// Serialized DOM after scripts ran
    pub html: String,
}

/// PNG screenshot of a page
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub png: Vec<u8>,
    pub title: Option<String>,
}

/// Capability interface for headless rendering
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Returns false when every call would fail with `Unavailable`
    fn is_available(&self) -> bool;

    /// Fails with `Unavailable` and installation guidance when no call can succeed
    fn ensure_available(&self) -> Result<(), RenderError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(RenderError::Unavailable(INSTALL_GUIDANCE.to_string()))
        }
    }

    /// Loads `url`, runs its scripts and returns the resulting DOM
    async fn render(&self, url: &Url, options: &RenderOptions)
        -> Result<RenderedPage, RenderError>;

    /// Captures `url` as a PNG
    async fn screenshot(
        &self,
        url: &Url,
        options: &ScreenshotOptions,
    ) -> Result<Screenshot, RenderError>;
}

/// Engine used when no browser is available
#[derive(Debug, Clone)]
pub struct UnavailableRenderer {
    guidance: String,
}

impl UnavailableRenderer {
    pub fn new(guidance: impl Into<String>) -> Self {
        Self {
            guidance: guidance.into(),
        }
    }
}

#[async_trait]
impl RenderEngine for UnavailableRenderer {
    fn is_available(&self) -> bool {
        false
    }

    fn ensure_available(&self) -> Result<(), RenderError> {
        Err(RenderError::Unavailable(self.guidance.clone()))
    }

    async fn render(
        &self,
        _url: &Url,
        _options: &RenderOptions,
    ) -> Result<RenderedPage, RenderError> {
        Err(RenderError::Unavailable(self.guidance.clone()))
    }

    async fn screenshot(
        &self,
        _url: &Url,
        _options: &ScreenshotOptions,
    ) -> Result<Screenshot, RenderError> {
        Err(RenderError::Unavailable(self.guidance.clone()))
    }
}

/// Validates a CSS selector before any browser work
pub fn validate_selector(selector: &str) -> Result<(), RenderError> {
    scraper::Selector::parse(selector)
        .map(|_| ())
        .map_err(|_| RenderError::InvalidSelector(selector.to_string()))
}

/// Picks the render engine for this configuration
///
/// # Arguments
///
/// * `config` - Renderer section of the configuration
/// * `user_agent` - User-Agent string passed to the browser
///
/// # Returns
///
/// A `ChromeRenderer` when a browser executable is found, an
/// `UnavailableRenderer` carrying installation guidance otherwise.
pub fn build_render_engine(config: &RendererConfig, user_agent: &str) -> Arc<dyn RenderEngine> {
    if !config.enabled {
        tracing::info!("Rendering disabled by configuration");
        return Arc::new(UnavailableRenderer::new(
            "Rendering is disabled. Set `[renderer] enabled = true` to use it.",
        ));
    }

    match find_browser_executable(config.chrome_path.as_deref()) {
        Some(executable) => Arc::new(ChromeRenderer::new(
            executable,
            Duration::from_secs(config.timeout_secs),
            user_agent,
        )),
        None => {
            tracing::warn!("No Chrome/Chromium executable found; rendering unavailable");
            Arc::new(UnavailableRenderer::new(INSTALL_GUIDANCE))
        }
    }
}
