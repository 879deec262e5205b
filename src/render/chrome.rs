//! Headless Chrome/Chromium driven over the DevTools protocol
//!
//! Each call launches a fresh browser with its own temporary profile, so
//! calls never share cookies or storage. Rendered fetches wait for
//! navigation, then poll for the requested selector. Screenshots set the
//! viewport before loading and let the browser measure full-page captures.

use crate::render::{
    validate_selector, RenderEngine, RenderError, RenderOptions, RenderedPage, Screenshot,
    ScreenshotOptions,
};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use url::Url;

/// Window size used for rendered fetches
const RENDER_WINDOW: (u32, u32) = (1280, 720);

/// Interval between selector lookups
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Find Chrome/Chromium executable on the system
///
/// Lookup order: the configured path, the `CHROMIUM_PATH` environment
/// variable, well-known install locations, then the executables on `PATH`.
pub fn find_browser_executable(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            tracing::info!("Using configured browser: {}", path.display());
            return Some(path.to_path_buf());
        }
        tracing::warn!("Configured chrome-path does not exist: {}", path.display());
    }

    // Environment variable overrides the search
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            tracing::info!(
                "Using browser from CHROMIUM_PATH environment variable: {}",
                path.display()
            );
            return Some(path);
        }
        tracing::warn!(
            "CHROMIUM_PATH environment variable points to non-existent file: {}",
            path.display()
        );
    }

    let well_known: &[&str] = if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };

    if let Some(path) = well_known.iter().map(PathBuf::from).find(|p| p.exists()) {
        tracing::info!("Found browser at: {}", path.display());
        return Some(path);
    }

    let search_path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&search_path) {
        for name in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            let candidate = dir.join(name);
            if candidate.is_file() {
                tracing::info!("Found browser on PATH: {}", candidate.display());
                return Some(candidate);
            }
        }
    }

    None
}

/// Render engine backed by a local Chrome/Chromium binary
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    executable: PathBuf,
    timeout: Duration,
    user_agent: String,
}

/// One launched browser and the task pumping its protocol events
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    profile: PathBuf,
}

impl BrowserSession {
    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser close failed: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
        if let Err(e) = tokio::fs::remove_dir_all(&self.profile).await {
            tracing::debug!("Could not remove profile {}: {}", self.profile.display(), e);
        }
    }
}

impl ChromeRenderer {
    pub fn new(executable: PathBuf, timeout: Duration, user_agent: &str) -> Self {
        Self {
            executable,
            timeout,
            user_agent: user_agent.to_string(),
        }
    }

    /// Launches a headless browser with a throwaway profile
    async fn launch(&self, width: u32, height: u32) -> Result<BrowserSession, RenderError> {
        let profile = std::env::temp_dir().join(format!(
            "webscrape-chrome-{}",
            uuid::Uuid::new_v4().simple()
        ));
        tokio::fs::create_dir_all(&profile).await?;

        match self.launch_with_profile(&profile, width, height).await {
            Ok((browser, handler)) => Ok(BrowserSession {
                browser,
                handler,
                profile,
            }),
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&profile).await;
                Err(e)
            }
        }
    }

    async fn launch_with_profile(
        &self,
        profile: &Path,
        width: u32,
        height: u32,
    ) -> Result<(Browser, JoinHandle<()>), RenderError> {
        let config = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .user_data_dir(profile)
            .request_timeout(self.timeout)
            .window_size(width, height)
            .no_sandbox()
            .arg(format!("--user-agent={}", self.user_agent))
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg("--mute-audio")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .build()
            .map_err(RenderError::Launch)?;

        tracing::debug!("Launching {}", self.executable.display());
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler error: {}", e);
                }
            }
        });

        Ok((browser, handler))
    }

    async fn render_in(
        &self,
        browser: &Browser,
        url: &Url,
        options: &RenderOptions,
    ) -> Result<RenderedPage, RenderError> {
        let (width, height) = RENDER_WINDOW;
        let page = open_page(browser, url, width, height).await?;

        if let Some(selector) = &options.wait_for_selector {
            wait_for_selector(&page, url, selector, self.timeout).await?;
        }
        if options.wait_seconds > 0 {
            tokio::time::sleep(Duration::from_secs(options.wait_seconds)).await;
        }

        let html = page.content().await.map_err(|e| failed(url, e))?;
        close_page(page).await;

        Ok(RenderedPage {
            url: url.clone(),
            html,
        })
    }

    async fn screenshot_in(
        &self,
        browser: &Browser,
        url: &Url,
        options: &ScreenshotOptions,
    ) -> Result<Screenshot, RenderError> {
        let page = open_page(browser, url, options.width, options.height).await?;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(options.full_page)
            .build();
        let png = page.screenshot(params).await.map_err(|e| failed(url, e))?;

        // Title is informational; a failed lookup does not fail the capture
        let title = match page.get_title().await {
            Ok(title) => title.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                tracing::debug!("Could not read title for {}: {}", url, e);
                None
            }
        };
        close_page(page).await;

        Ok(Screenshot { png, title })
    }
}

#[async_trait]
impl RenderEngine for ChromeRenderer {
    fn is_available(&self) -> bool {
        true
    }

    async fn render(
        &self,
        url: &Url,
        options: &RenderOptions,
    ) -> Result<RenderedPage, RenderError> {
        if let Some(selector) = &options.wait_for_selector {
            validate_selector(selector)?;
        }

        // Navigation and the selector wait each get the configured timeout
        let limit = self.timeout * 2 + Duration::from_secs(options.wait_seconds);
        let (width, height) = RENDER_WINDOW;
        let session = self.launch(width, height).await?;
        let result =
            tokio::time::timeout(limit, self.render_in(&session.browser, url, options)).await;
        session.close().await;

        result.unwrap_or_else(|_| {
            Err(RenderError::Timeout {
                url: url.to_string(),
                seconds: limit.as_secs(),
            })
        })
    }

    async fn screenshot(
        &self,
        url: &Url,
        options: &ScreenshotOptions,
    ) -> Result<Screenshot, RenderError> {
        let limit = self.timeout * 2;
        let session = self.launch(options.width, options.height).await?;
        let result =
            tokio::time::timeout(limit, self.screenshot_in(&session.browser, url, options)).await;
        session.close().await;

        result.unwrap_or_else(|_| {
            Err(RenderError::Timeout {
                url: url.to_string(),
                seconds: limit.as_secs(),
            })
        })
    }
}

/// Opens a blank tab, sizes its viewport and navigates to `url`
async fn open_page(
    browser: &Browser,
    url: &Url,
    width: u32,
    height: u32,
) -> Result<Page, RenderError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| failed(url, e))?;

    let metrics =
        SetDeviceMetricsOverrideParams::new(i64::from(width), i64::from(height), 1.0, false);
    page.execute(metrics).await.map_err(|e| failed(url, e))?;

    page.goto(url.as_str()).await.map_err(|e| failed(url, e))?;
    page.wait_for_navigation().await.map_err(|e| failed(url, e))?;
    Ok(page)
}

/// Polls the DOM until `selector` matches or `limit` elapses
async fn wait_for_selector(
    page: &Page,
    url: &Url,
    selector: &str,
    limit: Duration,
) -> Result<(), RenderError> {
    let started = Instant::now();
    loop {
        if page.find_element(selector).await.is_ok() {
            tracing::debug!(
                "Selector '{}' appeared on {} after {:.2}s",
                selector,
                url,
                started.elapsed().as_secs_f64()
            );
            return Ok(());
        }
        if started.elapsed() >= limit {
            return Err(RenderError::Failed {
                url: url.to_string(),
                message: format!(
                    "selector '{}' did not appear within {}s",
                    selector,
                    limit.as_secs()
                ),
            });
        }
        tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
    }
}

async fn close_page(page: Page) {
    if let Err(e) = page.close().await {
        tracing::debug!("Page close failed: {}", e);
    }
}

fn failed(url: &Url, e: impl Display) -> RenderError {
    RenderError::Failed {
        url: url.to_string(),
        message: e.to_string(),
    }
}
