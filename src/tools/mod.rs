//! Tool service: the externally exposed scraping operations
//!
//! `ScrapeService` wires one shared resource store, one HTTP client and one
//! render engine into the operations:
//! - `scrape_url` / `scrape_multiple_urls`
//! - `crawl_site`
//! - `extract_links`
//! - `scrape_with_js` / `screenshot_url`
//! - `get_resource`
//!
//! Input is validated before any network activity. Large content never
//! travels in results; callers get a preview and a `scrape://` URI.

mod params;
mod results;

pub use params::{
    CrawlSiteParams, ExtractLinksParams, ScrapeMultipleParams, ScrapeUrlParams,
    ScrapeWithJsParams, ScreenshotParams, DEFAULT_WAIT_SECONDS, MAX_BATCH_URLS,
};
pub use results::{
    BatchEntry, ExtractLinksResult, ResourceContent, ScrapeMultipleResult, ScrapeStats,
    ScrapeUrlResult, ScrapeWithJsResult, ScreenshotResult, Viewport,
};

use crate::config::Config;
use crate::crawler::{
    build_http_client, capture_page, parse_html, CaptureOptions, CapturedPage, Coordinator,
    CrawlJob, CrawlReport, FetchError, FetchMode, Fetcher, HttpFetcher, RenderedFetcher,
};
use crate::output::{preview, ResponseFormat};
use crate::render::{
    build_render_engine, validate_selector, RenderEngine, RenderOptions, ScreenshotOptions,
    MAX_VIEWPORT_HEIGHT, MAX_VIEWPORT_WIDTH, MAX_WAIT_SECONDS, MIN_VIEWPORT_HEIGHT,
    MIN_VIEWPORT_WIDTH,
};
use crate::store::{open_store, ResourceMetadata, ResourceStore, ResourceUri};
use crate::url::{classify_link, normalize_url};
use crate::{Result, ScrapeError};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Shared entry point for every scraping operation
pub struct ScrapeService {
    config: Config,
    store: Arc<dyn ResourceStore>,
    http: Arc<HttpFetcher>,
    renderer: Arc<dyn RenderEngine>,
}

impl ScrapeService {
    /// Creates a service over an existing store and render engine
    ///
    /// # Returns
    ///
    /// * `Ok(ScrapeService)` - Ready to serve requests
    /// * `Err(ScrapeError::Http)` - The HTTP client could not be built
    pub fn new(
        config: Config,
        store: Arc<dyn ResourceStore>,
        renderer: Arc<dyn RenderEngine>,
    ) -> Result<Self> {
        let client = build_http_client(&config)?;
        Ok(Self {
            config,
            store,
            http: Arc::new(HttpFetcher::new(client)),
            renderer,
        })
    }

    /// Opens the configured store backend and discovers a browser
    pub fn from_config(config: Config) -> Result<Self> {
        let store = open_store(&config.store)?;
        let renderer =
            build_render_engine(&config.renderer, &config.user_agent.header_value());
        Self::new(config, store, renderer)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn ResourceStore> {
        Arc::clone(&self.store)
    }

    /// Returns true when rendered scrapes and screenshots can run
    pub fn rendering_available(&self) -> bool {
        self.renderer.is_available()
    }

    /// Fetches one URL and stores it in the requested format
    pub async fn scrape_url(&self, params: ScrapeUrlParams) -> Result<ScrapeUrlResult> {
        let url = parse_input_url(&params.url)?;
        tracing::info!("Scraping {}", url);

        let page = self
            .http
            .fetch(&url)
            .await
            .map_err(|e| fetch_failure(&params.url, e))?;

        let options = CaptureOptions {
            include_links: params.include_links,
            include_images: params.include_images,
            ..CaptureOptions::new(params.response_format, FetchMode::Static)
        };
        let captured = capture_page(self.store.as_ref(), &page, &options)?;

        Ok(self.scrape_result(
            &params.url,
            page.status_code,
            &captured,
            params.response_format,
            params.include_metadata,
        ))
    }

    /// Scrapes up to 20 URLs concurrently, results in input order
    ///
    /// Per-URL failures are reported in their entry. The batch fails only
    /// when every URL failed.
    pub async fn scrape_multiple_urls(
        &self,
        params: ScrapeMultipleParams,
    ) -> Result<ScrapeMultipleResult> {
        if params.urls.is_empty() || params.urls.len() > MAX_BATCH_URLS {
            return Err(ScrapeError::InvalidInput(format!(
                "urls must contain 1 to {} entries, got {}",
                MAX_BATCH_URLS,
                params.urls.len()
            )));
        }
        for raw in &params.urls {
            parse_input_url(raw)?;
        }

        let scraped_at = Utc::now();
        let workers = self.config.crawler.workers.max(1) as usize;
        let format = params.response_format;
        let include_metadata = params.include_metadata;

        let results: Vec<BatchEntry> = stream::iter(params.urls.iter())
            .map(|raw| self.scrape_batch_entry(raw, format, include_metadata))
            .buffered(workers)
            .collect()
            .await;

        let successful = results.iter().filter(|r| r.success).count();
        let failed = results.len() - successful;
        tracing::info!(
            "Batch of {} URLs finished: {} succeeded, {} failed",
            results.len(),
            successful,
            failed
        );

        Ok(ScrapeMultipleResult {
            success: successful > 0,
            total_urls: results.len(),
            successful,
            failed,
            scraped_at,
            results,
        })
    }

    async fn scrape_batch_entry(
        &self,
        raw: &str,
        format: ResponseFormat,
        include_metadata: bool,
    ) -> BatchEntry {
        let params = ScrapeUrlParams {
            response_format: format,
            include_metadata,
            ..ScrapeUrlParams::new(raw)
        };
        match self.scrape_url(params).await {
            Ok(result) => BatchEntry {
                url: raw.to_string(),
                success: true,
                scrape_id: Some(result.scrape_id),
                resource_uri: Some(result.resource_uri),
                preview: Some(result.preview),
                content_length: Some(result.content_length),
                status_code: result.status_code,
                title: if include_metadata { result.title } else { None },
                error: None,
            },
            Err(e) => {
                tracing::warn!("Batch entry {} failed: {}", raw, e);
                let message = match e {
                    ScrapeError::Fetch { message, .. } => message,
                    other => other.to_string(),
                };
                BatchEntry::failed(raw, message)
            }
        }
    }

    /// Crawls a site breadth-first
    ///
    /// # Arguments
    ///
    /// * `params` - Start URL, limits and fetch mode
    /// * `cancel` - Stops the crawl; partial results are returned
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Page records in dispatch order
    /// * `Err(ScrapeError::InvalidInput)` - Malformed start URL
    /// * `Err(ScrapeError::RenderingUnavailable)` - Rendered mode without a browser
    pub async fn crawl_site(
        &self,
        params: CrawlSiteParams,
        cancel: CancellationToken,
    ) -> Result<CrawlReport> {
        parse_input_url(&params.url)?;

        let fetcher: Arc<dyn Fetcher> = match params.fetch_mode {
            FetchMode::Static => Arc::clone(&self.http) as Arc<dyn Fetcher>,
            FetchMode::Rendered => {
                self.require_renderer()?;
                Arc::new(RenderedFetcher::new(
                    Arc::clone(&self.renderer),
                    RenderOptions::default(),
                ))
            }
        };

        let job = CrawlJob {
            start_url: params.url,
            max_depth: params.max_depth,
            max_pages: params.max_pages,
            same_domain_only: params.same_domain_only,
            response_format: params.response_format,
            fetch_mode: params.fetch_mode,
        };

        let mut coordinator = Coordinator::new(fetcher, self.store(), &self.config)
            .with_cancellation(cancel);
        if let Some(secs) = params.timeout_secs {
            coordinator = coordinator.with_timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }

        coordinator.run(job).await
    }

    /// Lists the links of one page, split into internal and external
    ///
    /// Nothing is stored. Counts cover every distinct link; with
    /// `same_domain_only` the external list itself is left empty.
    pub async fn extract_links(&self, params: ExtractLinksParams) -> Result<ExtractLinksResult> {
        let url = parse_input_url(&params.url)?;
        tracing::info!("Extracting links from {}", url);

        let page = self
            .http
            .fetch(&url)
            .await
            .map_err(|e| fetch_failure(&params.url, e))?;

        let links = if page.is_html() {
            parse_html(&page.text()).links(&page.final_url, params.include_anchors)
        } else {
            Vec::new()
        };

        let (internal, external): (Vec<Url>, Vec<Url>) = links
            .into_iter()
            .partition(|link| classify_link(&url, link).is_internal());

        let internal_links_count = internal.len();
        let external_links_count = external.len();
        let external_links = if params.same_domain_only {
            Vec::new()
        } else {
            external.into_iter().map(String::from).collect()
        };

        Ok(ExtractLinksResult {
            success: true,
            url: params.url,
            total_links: internal_links_count + external_links_count,
            internal_links_count,
            external_links_count,
            extracted_at: Utc::now(),
            internal_links: internal.into_iter().map(String::from).collect(),
            external_links,
        })
    }

    /// Scrapes a page after running its scripts in a headless browser
    pub async fn scrape_with_js(&self, params: ScrapeWithJsParams) -> Result<ScrapeWithJsResult> {
        let url = parse_input_url(&params.url)?;
        if params.wait_seconds > MAX_WAIT_SECONDS {
            return Err(ScrapeError::InvalidInput(format!(
                "wait_seconds must be at most {}, got {}",
                MAX_WAIT_SECONDS, params.wait_seconds
            )));
        }
        if let Some(selector) = &params.wait_for_selector {
            validate_selector(selector)?;
        }
        self.require_renderer()?;

        tracing::info!("Rendering {} (wait {}s)", url, params.wait_seconds);
        let fetcher = RenderedFetcher::new(
            Arc::clone(&self.renderer),
            RenderOptions {
                wait_for_selector: params.wait_for_selector.clone(),
                wait_seconds: params.wait_seconds,
            },
        );
        let page = fetcher
            .fetch(&url)
            .await
            .map_err(|e| fetch_failure(&params.url, e))?;

        let options = CaptureOptions::new(params.response_format, FetchMode::Rendered);
        let captured = capture_page(self.store.as_ref(), &page, &options)?;

        Ok(ScrapeWithJsResult {
            scrape: self.scrape_result(
                &params.url,
                page.status_code,
                &captured,
                params.response_format,
                true,
            ),
            rendering_method: FetchMode::Rendered.rendering_method().to_string(),
        })
    }

    /// Captures a PNG screenshot and stores it
    pub async fn screenshot_url(&self, params: ScreenshotParams) -> Result<ScreenshotResult> {
        let url = parse_input_url(&params.url)?;
        if !(MIN_VIEWPORT_WIDTH..=MAX_VIEWPORT_WIDTH).contains(&params.width) {
            return Err(ScrapeError::InvalidInput(format!(
                "width must be between {} and {}, got {}",
                MIN_VIEWPORT_WIDTH, MAX_VIEWPORT_WIDTH, params.width
            )));
        }
        if !(MIN_VIEWPORT_HEIGHT..=MAX_VIEWPORT_HEIGHT).contains(&params.height) {
            return Err(ScrapeError::InvalidInput(format!(
                "height must be between {} and {}, got {}",
                MIN_VIEWPORT_HEIGHT, MAX_VIEWPORT_HEIGHT, params.height
            )));
        }
        self.require_renderer()?;

        tracing::info!(
            "Capturing {} at {}x{}{}",
            url,
            params.width,
            params.height,
            if params.full_page { " (full page)" } else { "" }
        );
        let options = ScreenshotOptions {
            width: params.width,
            height: params.height,
            full_page: params.full_page,
        };
        let screenshot = self.renderer.screenshot(&url, &options).await?;

        let size = screenshot.png.len();
        let metadata = ResourceMetadata {
            url: params.url.clone(),
            title: screenshot.title.clone(),
            format: "png".to_string(),
            mime_type: "image/png".to_string(),
            content_length: size,
            rendering_method: Some(FetchMode::Rendered.rendering_method().to_string()),
            ..ResourceMetadata::default()
        };
        let handle = self.store.put(screenshot.png, metadata)?;
        let resource_uri = handle.content_uri();

        Ok(ScreenshotResult {
            success: true,
            note: format!(
                "PNG image stored; read {} to retrieve it before {}",
                resource_uri,
                handle.expires_at.to_rfc3339()
            ),
            scrape_id: handle.scrape_id,
            url: params.url,
            title: screenshot.title,
            resource_uri,
            viewport: Viewport {
                width: params.width,
                height: params.height,
            },
            full_page: params.full_page,
            screenshot_size_bytes: size,
            captured_at: handle.scraped_at,
            expires_at: handle.expires_at,
        })
    }

    /// Resolves a `scrape://` URI, or a bare scrape id, to its payload
    ///
    /// A bare id resolves to the content.
    pub fn get_resource(&self, reference: &str) -> Result<ResourceContent> {
        let uri = match ResourceUri::parse(reference) {
            Some(uri) => uri,
            None => {
                let id = reference.trim();
                if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(ScrapeError::InvalidInput(format!(
                        "not a resource URI or scrape id: {}",
                        reference
                    )));
                }
                ResourceUri::Content(id.to_string())
            }
        };

        let resource = self.store.get(uri.scrape_id())?;
        Ok(match uri {
            ResourceUri::Content(_) => ResourceContent::Content {
                mime_type: resource.metadata.mime_type.clone(),
                scrape_id: resource.scrape_id,
                bytes: resource.content,
            },
            ResourceUri::Metadata(_) => ResourceContent::Metadata(resource.metadata_json()),
        })
    }

    /// Removes expired resources now
    pub fn sweep(&self) -> Result<usize> {
        Ok(self.store.expire(Utc::now())?)
    }

    fn require_renderer(&self) -> Result<()> {
        Ok(self.renderer.ensure_available()?)
    }

    fn scrape_result(
        &self,
        url: &str,
        status_code: Option<u16>,
        captured: &CapturedPage,
        format: ResponseFormat,
        include_metadata: bool,
    ) -> ScrapeUrlResult {
        let has_metadata = include_metadata
            && (captured.parsed.title.is_some() || captured.parsed.description.is_some());
        let format = if captured.is_html {
            format.as_str().to_string()
        } else {
            "raw".to_string()
        };

        ScrapeUrlResult {
            success: true,
            scrape_id: captured.handle.scrape_id.clone(),
            url: url.to_string(),
            resource_uri: captured.handle.content_uri(),
            metadata_uri: captured.handle.metadata_uri(),
            preview: preview(&captured.content, self.config.store.preview_length),
            content_length: captured.content_length,
            format,
            status_code,
            title: include_metadata.then(|| captured.parsed.title.clone()).flatten(),
            description: include_metadata
                .then(|| captured.parsed.description.clone())
                .flatten(),
            scraped_at: captured.handle.scraped_at,
            expires_at: captured.handle.expires_at,
            stats: ScrapeStats {
                total_links: captured.links.len(),
                total_images: captured.images.len(),
                has_metadata,
            },
        }
    }
}

/// Validates a caller-supplied URL
fn parse_input_url(raw: &str) -> Result<Url> {
    normalize_url(raw).map_err(|e| ScrapeError::InvalidInput(format!("{}: {}", raw, e)))
}

fn fetch_failure(url: &str, error: FetchError) -> ScrapeError {
    ScrapeError::Fetch {
        url: url.to_string(),
        message: error.message,
    }
}
