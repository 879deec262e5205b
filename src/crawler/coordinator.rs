//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop. The coordinator is the single owner
//! of the frontier, the visited set, store writes and the result
//! aggregator. Worker tasks only fetch and report back over a channel.
//!
//! Each depth is handled as one layer:
//! 1. Dispatch every entry of the layer, bounded by a semaphore
//! 2. Collect completions into dispatch-order slots
//! 3. Walk the slots in order: store pages, record outcomes, offer links
//! 4. Advance to the next depth
//!
//! Because links are offered only after the whole layer drained, discovery
//! order does not depend on which fetch finished first.

use crate::config::Config;
use crate::crawler::aggregator::{CrawlReport, PageRecord, ResultAggregator};
use crate::crawler::fetcher::{FetchError, FetchMode, FetchedPage, Fetcher};
use crate::crawler::processor::{capture_page, CaptureOptions};
use crate::crawler::scheduler::{Frontier, FrontierEntry};
use crate::output::{preview, ResponseFormat};
use crate::state::PageState;
use crate::store::ResourceStore;
use crate::url::{classify_link, normalize_url};
use crate::ScrapeError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

/// Deepest allowed crawl depth
pub const MAX_CRAWL_DEPTH: u32 = 5;

/// Largest allowed page budget
pub const MAX_CRAWL_PAGES: usize = 100;

pub const DEFAULT_CRAWL_DEPTH: u32 = 2;
pub const DEFAULT_CRAWL_PAGES: usize = 20;

/// One crawl invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlJob {
    /// Starting URL
    pub start_url: String,

    /// 0 = only the start URL
    pub max_depth: u32,

    /// Upper bound on page records
    pub max_pages: usize,

    /// Follow only links on the start URL's registrable domain
    pub same_domain_only: bool,

    pub response_format: ResponseFormat,

    pub fetch_mode: FetchMode,
}

impl CrawlJob {
    /// Creates a job with default limits
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            max_depth: DEFAULT_CRAWL_DEPTH,
            max_pages: DEFAULT_CRAWL_PAGES,
            same_domain_only: true,
            response_format: ResponseFormat::default(),
            fetch_mode: FetchMode::default(),
        }
    }

    /// Clamps depth to 0..=5 and pages to 1..=100
    pub fn clamped(mut self) -> Self {
        self.max_depth = self.max_depth.min(MAX_CRAWL_DEPTH);
        self.max_pages = self.max_pages.clamp(1, MAX_CRAWL_PAGES);
        self
    }
}

/// Message sent by a worker when its fetch completes
struct Completion {
    slot: usize,
    result: Result<FetchedPage, FetchError>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ResourceStore>,
    workers: usize,
    preview_length: usize,
    crawl_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Fetch strategy for every page of the crawl
    /// * `store` - Store receiving page content
    /// * `config` - Worker bound, crawl timeout and preview length
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn ResourceStore>, config: &Config) -> Self {
        Self {
            fetcher,
            store,
            workers: config.crawler.workers.max(1) as usize,
            preview_length: config.store.preview_length,
            crawl_timeout: config.crawler.crawl_timeout(),
            cancel: CancellationToken::new(),
        }
    }

    /// Uses an external token to cancel the crawl
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Overrides the configured crawl-wide timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.crawl_timeout = timeout;
        self
    }

    /// Token that cancels this coordinator's crawls
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs one crawl to completion, limit, or cancellation
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Page records in dispatch order
    /// * `Err(ScrapeError::InvalidInput)` - The start URL is not a valid http(s) URL
    pub async fn run(&self, job: CrawlJob) -> Result<CrawlReport, ScrapeError> {
        let job = job.clamped();
        let start = normalize_url(&job.start_url)
            .map_err(|e| ScrapeError::InvalidInput(format!("{}: {}", job.start_url, e)))?;

        if job.fetch_mode != self.fetcher.mode() {
            tracing::warn!(
                "Crawl requested {:?} fetching but coordinator uses {:?}",
                job.fetch_mode,
                self.fetcher.mode()
            );
        }

        tracing::info!(
            "Starting crawl of {} (max depth {}, max pages {}, same domain only: {})",
            start,
            job.max_depth,
            job.max_pages,
            job.same_domain_only
        );

        // Child token so a timeout never cancels the caller's token
        let cancel = self.cancel.child_token();
        let timer = self.crawl_timeout.map(|timeout| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::warn!("Crawl timeout of {:?} reached, cancelling", timeout);
                cancel.cancel();
            })
        });

        let mut frontier = Frontier::new(start.clone(), job.max_depth, job.max_pages);
        let mut aggregator = ResultAggregator::new(start.as_str(), job.max_depth, job.max_pages);
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let capture_options = CaptureOptions::new(job.response_format, self.fetcher.mode());
        let started = std::time::Instant::now();

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let layer = frontier.take_layer();
            if layer.is_empty() {
                break;
            }
            let depth = frontier.current_depth();
            tracing::debug!("Dispatching {} pages at depth {}", layer.len(), depth);

            let outcomes = self.fetch_layer(&layer, &semaphore, &cancel).await;

            for (entry, result) in layer.iter().zip(outcomes) {
                let Some(result) = result else {
                    // Never dispatched: cancellation arrived first
                    continue;
                };

                let record = match result {
                    Ok(page) => self.process_page(
                        &job,
                        &start,
                        entry,
                        &page,
                        &capture_options,
                        &mut frontier,
                    ),
                    Err(e) => PageRecord::failed(entry, &e),
                };
                aggregator.record(record);
            }

            tracing::info!(
                "Depth {} done: {} pages recorded, {} URLs seen, {:.1}s elapsed",
                depth,
                aggregator.len(),
                frontier.visited().len(),
                started.elapsed().as_secs_f64()
            );

            if !frontier.advance() {
                break;
            }
        }

        if let Some(timer) = timer {
            timer.abort();
        }

        let cancelled = cancel.is_cancelled();
        let report = aggregator.finish(cancelled);
        tracing::info!(
            "Crawl of {} finished: {} pages, {} failed{}",
            report.start_url,
            report.pages_crawled,
            report.pages_failed,
            if cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    /// Fetches one layer with bounded parallelism
    ///
    /// A worker permit is taken before each entry is spawned, so nothing is
    /// dispatched once the crawl is cancelled. Returns one slot per entry in
    /// dispatch order; `None` marks entries that were never dispatched.
    async fn fetch_layer(
        &self,
        layer: &[FrontierEntry],
        semaphore: &Arc<Semaphore>,
        cancel: &CancellationToken,
    ) -> Vec<Option<Result<FetchedPage, FetchError>>> {
        let mut slots: Vec<Option<Result<FetchedPage, FetchError>>> =
            (0..layer.len()).map(|_| None).collect();
        let (tx, mut rx) = mpsc::channel::<Completion>(layer.len().max(1));

        for (slot, entry) in layer.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                tracing::debug!("Cancelled before dispatching {}", entry.url);
                break;
            };
            if cancel.is_cancelled() {
                tracing::debug!("Cancelled before dispatching {}", entry.url);
                break;
            }

            let fetcher = Arc::clone(&self.fetcher);
            let cancel = cancel.clone();
            let tx = tx.clone();
            let url = entry.url.clone();

            tokio::spawn(async move {
                let _permit = permit;
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(cancelled_error()),
                    result = fetcher.fetch(&url) => result,
                };
                // Receiver only drops once every sender is gone
                let _ = tx.send(Completion { slot, result }).await;
            });
        }
        drop(tx);

        while let Some(completion) = rx.recv().await {
            slots[completion.slot] = Some(completion.result);
        }

        slots
    }

    /// Stores a fetched page and offers its links to the frontier
    fn process_page(
        &self,
        job: &CrawlJob,
        start: &url::Url,
        entry: &FrontierEntry,
        page: &FetchedPage,
        options: &CaptureOptions,
        frontier: &mut Frontier,
    ) -> PageRecord {
        // A redirect target counts as visited so a later link to it is not refetched
        if page.final_url != entry.url {
            if let Ok(target) = normalize_url(page.final_url.as_str()) {
                if frontier.mark_visited(&target) {
                    tracing::debug!("{} redirected to {}", entry.url, target);
                }
            }
        }

        let captured = match capture_page(self.store.as_ref(), page, options) {
            Ok(captured) => captured,
            Err(e) => {
                tracing::error!("Failed to store {}: {}", entry.url, e);
                let mut error = FetchError::new(PageState::Failed, format!("store error: {}", e));
                error.status_code = page.status_code;
                return PageRecord::failed(entry, &error);
            }
        };

        let mut internal = 0;
        let mut external = 0;
        let expand = frontier.can_expand_from(entry.depth);

        for link in &captured.links {
            let is_internal = classify_link(start, link).is_internal();
            if is_internal {
                internal += 1;
            } else {
                external += 1;
            }

            if expand && (is_internal || !job.same_domain_only) {
                frontier.offer(link.clone(), entry.depth + 1);
            }
        }

        let preview = preview(&captured.content, self.preview_length);
        PageRecord::stored(entry, page.status_code, &captured, preview, internal, external)
    }
}

fn cancelled_error() -> FetchError {
    FetchError::new(PageState::Cancelled, "crawl cancelled before the fetch completed")
}

/// Runs a complete crawl operation
///
/// This is the main entry point for a crawl. It will:
/// 1. Validate and clamp the job
/// 2. Fetch pages breadth-first with bounded parallelism
/// 3. Store each page in the resource store
/// 4. Follow links until the frontier is exhausted or a limit is reached
///
/// # Arguments
///
/// * `job` - What to crawl
/// * `fetcher` - Fetch strategy (static or rendered)
/// * `store` - Resource store shared with the other tools
/// * `config` - Application configuration
/// * `cancel` - Cancels the crawl; partial results are returned
pub async fn run_crawl(
    job: CrawlJob,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ResourceStore>,
    config: &Config,
    cancel: CancellationToken,
) -> Result<CrawlReport, ScrapeError> {
    Coordinator::new(fetcher, store, config)
        .with_cancellation(cancel)
        .run(job)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use url::Url;

    /// Serves an in-memory page graph
    struct GraphFetcher {
        pages: HashMap<String, Result<String, u16>>,
        redirects: HashMap<String, String>,
        delays: HashMap<String, Duration>,
        requests: Mutex<Vec<String>>,
    }

    impl GraphFetcher {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                redirects: HashMap::new(),
                delays: HashMap::new(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn page(mut self, url: &str, links: &[&str]) -> Self {
            let anchors: String = links
                .iter()
                .map(|l| format!(r#"<a href="{}">link</a>"#, l))
                .collect();
            let html = format!(
                "<html><head><title>{}</title></head><body>{}</body></html>",
                url, anchors
            );
            self.pages.insert(url.to_string(), Ok(html));
            self
        }

        fn status(mut self, url: &str, status: u16) -> Self {
            self.pages.insert(url.to_string(), Err(status));
            self
        }

        fn redirect(mut self, from: &str, to: &str) -> Self {
            self.redirects.insert(from.to_string(), to.to_string());
            self
        }

        fn delay(mut self, url: &str, delay: Duration) -> Self {
            self.delays.insert(url.to_string(), delay);
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for GraphFetcher {
        fn mode(&self) -> FetchMode {
            FetchMode::Static
        }

        async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            if let Some(delay) = self.delays.get(url.as_str()) {
                tokio::time::sleep(*delay).await;
            }
            let final_url = match self.redirects.get(url.as_str()) {
                Some(target) => Url::parse(target).unwrap(),
                None => url.clone(),
            };
            match self.pages.get(final_url.as_str()) {
                Some(Ok(html)) => Ok(FetchedPage {
                    url: url.clone(),
                    final_url,
                    status_code: Some(200),
                    content_type: Some("text/html".to_string()),
                    body: html.clone().into_bytes(),
                }),
                Some(Err(status)) => Err(FetchError {
                    state: PageState::from_status(*status),
                    status_code: Some(*status),
                    message: format!("HTTP {}", status),
                }),
                None => Err(FetchError {
                    state: PageState::DeadLink,
                    status_code: Some(404),
                    message: "HTTP 404".to_string(),
                }),
            }
        }
    }

    fn store() -> Arc<dyn ResourceStore> {
        Arc::new(MemoryStore::new(chrono::Duration::seconds(3600)))
    }

    fn job(url: &str, max_depth: u32, max_pages: usize) -> CrawlJob {
        CrawlJob {
            max_depth,
            max_pages,
            ..CrawlJob::new(url)
        }
    }

    async fn crawl(fetcher: Arc<GraphFetcher>, job: CrawlJob) -> CrawlReport {
        let config = Config::default();
        run_crawl(job, fetcher, store(), &config, CancellationToken::new())
            .await
            .unwrap()
    }

    fn urls(report: &CrawlReport) -> Vec<&str> {
        report.results.iter().map(|r| r.url.as_str()).collect()
    }

    fn site() -> GraphFetcher {
        GraphFetcher::new()
            .page("https://example.com/", &["/a", "/b", "https://other.com/x"])
            .page("https://example.com/a", &["/c", "/b", "/"])
            .page("https://example.com/b", &["/d"])
            .page("https://example.com/c", &["/e"])
            .page("https://example.com/d", &[])
            .page("https://example.com/e", &[])
            .page("https://other.com/x", &[])
    }

    #[test]
    fn test_job_clamping() {
        let job = job("https://example.com/", 9, 0).clamped();
        assert_eq!(job.max_depth, 5);
        assert_eq!(job.max_pages, 1);

        let job = CrawlJob {
            max_pages: 500,
            ..CrawlJob::new("https://example.com/")
        }
        .clamped();
        assert_eq!(job.max_pages, 100);
        assert_eq!(job.max_depth, DEFAULT_CRAWL_DEPTH);
    }

    #[tokio::test]
    async fn test_same_domain_depth_one() {
        let fetcher = Arc::new(site());
        let report = crawl(fetcher.clone(), job("https://example.com/", 1, 5)).await;

        assert!(report.success);
        assert_eq!(report.pages_crawled, 3);
        assert_eq!(
            urls(&report),
            vec![
                "https://example.com/",
                "https://example.com/a",
                "https://example.com/b"
            ]
        );
        assert!(!fetcher.requested().contains(&"https://other.com/x".to_string()));

        let root = &report.results[0];
        assert_eq!(root.internal_links, 2);
        assert_eq!(root.external_links, 1);
        assert!(root.resource_uri.as_deref().unwrap().starts_with("scrape://"));
    }

    #[tokio::test]
    async fn test_external_links_followed_when_allowed() {
        let fetcher = Arc::new(site());
        let mut job = job("https://example.com/", 1, 10);
        job.same_domain_only = false;
        let report = crawl(fetcher, job).await;
        assert_eq!(report.pages_crawled, 4);
        assert_eq!(report.results[3].url, "https://other.com/x");
    }

    #[tokio::test]
    async fn test_depth_bound_and_breadth_first_order() {
        let fetcher = Arc::new(site());
        let report = crawl(fetcher, job("https://example.com/", 2, 20)).await;

        assert!(report.results.iter().all(|r| r.depth <= 2));
        assert_eq!(
            urls(&report),
            vec![
                "https://example.com/",
                "https://example.com/a",
                "https://example.com/b",
                "https://example.com/c",
                "https://example.com/d"
            ]
        );
        let depths: Vec<u32> = report.results.iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![0, 1, 1, 2, 2]);
    }

    #[tokio::test]
    async fn test_max_depth_zero_fetches_only_start() {
        let fetcher = Arc::new(site());
        let report = crawl(fetcher.clone(), job("https://example.com/", 0, 20)).await;
        assert_eq!(report.pages_crawled, 1);
        assert_eq!(fetcher.requested(), vec!["https://example.com/"]);
    }

    #[tokio::test]
    async fn test_max_pages_one_with_many_links() {
        let links: Vec<String> = (0..50).map(|i| format!("/p{}", i)).collect();
        let link_refs: Vec<&str> = links.iter().map(|s| s.as_str()).collect();
        let fetcher = Arc::new(GraphFetcher::new().page("https://example.com/", &link_refs));

        let report = crawl(fetcher.clone(), job("https://example.com/", 3, 1)).await;
        assert_eq!(report.pages_crawled, 1);
        assert_eq!(report.results[0].internal_links, 50);
        assert_eq!(fetcher.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_max_pages_caps_records() {
        let links: Vec<String> = (0..50).map(|i| format!("/p{}", i)).collect();
        let link_refs: Vec<&str> = links.iter().map(|s| s.as_str()).collect();
        let fetcher = Arc::new(GraphFetcher::new().page("https://example.com/", &link_refs));

        let report = crawl(fetcher, job("https://example.com/", 3, 7)).await;
        assert_eq!(report.pages_crawled, 7);
        assert_eq!(report.results[6].url, "https://example.com/p5");
    }

    #[tokio::test]
    async fn test_dead_link_does_not_fail_crawl() {
        let fetcher = Arc::new(
            GraphFetcher::new()
                .page("https://example.com/", &["/missing", "/ok"])
                .status("https://example.com/missing", 404)
                .page("https://example.com/ok", &[]),
        );
        let report = crawl(fetcher, job("https://example.com/", 1, 10)).await;

        assert!(report.success);
        assert_eq!(report.pages_failed, 1);
        let missing = &report.results[1];
        assert!(!missing.success);
        assert_eq!(missing.status_code, Some(404));
        assert_eq!(missing.state, PageState::DeadLink);
        assert!(missing.error.is_some());
    }

    #[tokio::test]
    async fn test_failed_start_url_fails_crawl() {
        let fetcher = Arc::new(GraphFetcher::new().status("https://example.com/", 500));
        let report = crawl(fetcher, job("https://example.com/", 2, 10)).await;
        assert!(!report.success);
        assert_eq!(report.pages_crawled, 1);
        assert_eq!(report.results[0].state, PageState::HttpError);
    }

    #[tokio::test]
    async fn test_order_independent_of_completion_timing() {
        let fast = site();
        let slow = site()
            .delay("https://example.com/a", Duration::from_millis(60))
            .delay("https://example.com/c", Duration::from_millis(30));

        let first = crawl(Arc::new(fast), job("https://example.com/", 3, 20)).await;
        let second = crawl(Arc::new(slow), job("https://example.com/", 3, 20)).await;

        assert_eq!(urls(&first), urls(&second));
        assert_eq!(first.pages_crawled, second.pages_crawled);
    }

    #[tokio::test]
    async fn test_invalid_start_url() {
        let config = Config::default();
        let result = run_crawl(
            CrawlJob::new("not a url"),
            Arc::new(GraphFetcher::new()),
            store(),
            &config,
            CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(ScrapeError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_cancellation_returns_partial_results() {
        let fetcher = Arc::new(
            site()
                .delay("https://example.com/a", Duration::from_secs(30))
                .delay("https://example.com/b", Duration::from_secs(30)),
        );
        let config = Config::default();
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let report = run_crawl(job("https://example.com/", 2, 20), fetcher, store(), &config, cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report.success);
        assert_eq!(report.pages_crawled, 3);
        assert_eq!(report.results[1].state, PageState::Cancelled);
        assert_eq!(report.results[2].state, PageState::Cancelled);
    }

    #[tokio::test]
    async fn test_crawl_timeout_cancels() {
        let fetcher: Arc<dyn Fetcher> = Arc::new(
            site().delay("https://example.com/a", Duration::from_secs(30)),
        );
        let config = Config::default();
        let report = Coordinator::new(fetcher, store(), &config)
            .with_timeout(Some(Duration::from_millis(100)))
            .run(job("https://example.com/", 2, 20))
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.results[1].state, PageState::Cancelled);
        assert_eq!(report.results[2].state, PageState::Processed);
    }

    #[tokio::test]
    async fn test_cancellation_stops_queued_dispatch() {
        let links: Vec<String> = (0..10).map(|i| format!("/p{}", i)).collect();
        let link_refs: Vec<&str> = links.iter().map(|s| s.as_str()).collect();
        let mut graph = GraphFetcher::new().page("https://example.com/", &link_refs);
        for i in 0..10 {
            let url = format!("https://example.com/p{}", i);
            graph = graph.page(&url, &[]).delay(&url, Duration::from_secs(30));
        }
        let fetcher = Arc::new(graph);

        let mut config = Config::default();
        config.crawler.workers = 1;
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            canceller.cancel();
        });

        let report = run_crawl(
            job("https://example.com/", 1, 20),
            fetcher.clone(),
            store(),
            &config,
            cancel,
        )
        .await
        .unwrap();

        assert!(report.cancelled);
        // Only the start page and the one in-flight entry were dispatched
        assert_eq!(
            fetcher.requested(),
            vec!["https://example.com/", "https://example.com/p0"]
        );
        assert_eq!(report.pages_crawled, 2);
        assert_eq!(report.results[0].state, PageState::Processed);
        assert_eq!(report.results[1].url, "https://example.com/p0");
        assert_eq!(report.results[1].state, PageState::Cancelled);
    }

    #[tokio::test]
    async fn test_redirect_target_is_not_refetched() {
        let fetcher = Arc::new(
            GraphFetcher::new()
                .page("https://example.com/", &["/old", "/about"])
                .redirect("https://example.com/old", "https://example.com/new")
                .page("https://example.com/new", &[])
                .page("https://example.com/about", &["/new"]),
        );
        let report = crawl(fetcher.clone(), job("https://example.com/", 2, 20)).await;

        assert_eq!(
            urls(&report),
            vec![
                "https://example.com/",
                "https://example.com/old",
                "https://example.com/about"
            ]
        );
        assert!(!fetcher.requested().contains(&"https://example.com/new".to_string()));
    }
}
