//! Crawl result aggregation
//!
//! Page outcomes are recorded in dispatch order and assembled into the
//! final `CrawlReport`.

use crate::crawler::fetcher::FetchError;
use crate::crawler::processor::CapturedPage;
use crate::crawler::scheduler::FrontierEntry;
use crate::state::PageState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of fetching one frontier entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub depth: u32,
    pub success: bool,
    pub state: PageState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub internal_links: usize,
    pub external_links: usize,
}

impl PageRecord {
    /// Record for a page that was fetched and stored
    pub fn stored(
        entry: &FrontierEntry,
        status_code: Option<u16>,
        captured: &CapturedPage,
        preview: String,
        internal_links: usize,
        external_links: usize,
    ) -> Self {
        Self {
            url: entry.url.to_string(),
            depth: entry.depth,
            success: true,
            state: PageState::Processed,
            status_code,
            scrape_id: Some(captured.handle.scrape_id.clone()),
            resource_uri: Some(captured.handle.content_uri()),
            title: captured.parsed.title.clone(),
            content_length: Some(captured.content_length),
            preview: Some(preview),
            error: None,
            internal_links,
            external_links,
        }
    }

    /// Record for a page whose fetch or storage failed
    pub fn failed(entry: &FrontierEntry, error: &FetchError) -> Self {
        Self {
            url: entry.url.to_string(),
            depth: entry.depth,
            success: false,
            state: error.state,
            status_code: error.status_code,
            scrape_id: None,
            resource_uri: None,
            title: None,
            content_length: None,
            preview: None,
            error: Some(error.message.clone()),
            internal_links: 0,
            external_links: 0,
        }
    }
}

/// Final result of a crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    /// False only when the start URL itself failed
    pub success: bool,
    pub start_url: String,
    /// Number of page records, failures included
    pub pages_crawled: usize,
    pub pages_failed: usize,
    pub max_depth: u32,
    pub max_pages: usize,
    pub crawled_at: DateTime<Utc>,
    /// True when the crawl stopped early on cancellation or timeout
    pub cancelled: bool,
    pub results: Vec<PageRecord>,
}

impl CrawlReport {
    /// Counts records per page state, in first-seen order
    pub fn state_counts(&self) -> Vec<(PageState, usize)> {
        let mut counts: Vec<(PageState, usize)> = Vec::new();
        for record in &self.results {
            match counts.iter_mut().find(|(state, _)| *state == record.state) {
                Some((_, count)) => *count += 1,
                None => counts.push((record.state, 1)),
            }
        }
        counts
    }

    /// Deepest depth that produced a record
    pub fn deepest(&self) -> u32 {
        self.results.iter().map(|r| r.depth).max().unwrap_or(0)
    }
}

/// Collects page records in dispatch order
#[derive(Debug)]
pub struct ResultAggregator {
    start_url: String,
    max_depth: u32,
    max_pages: usize,
    crawled_at: DateTime<Utc>,
    records: Vec<PageRecord>,
}

impl ResultAggregator {
    pub fn new(start_url: &str, max_depth: u32, max_pages: usize) -> Self {
        Self {
            start_url: start_url.to_string(),
            max_depth,
            max_pages,
            crawled_at: Utc::now(),
            records: Vec::new(),
        }
    }

    /// Appends the next record in dispatch order
    pub fn record(&mut self, record: PageRecord) {
        if !record.success {
            tracing::debug!(
                "{} failed at depth {}: {} ({})",
                record.url,
                record.depth,
                record.error.as_deref().unwrap_or("unknown error"),
                record.state
            );
        }
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Assembles the report
    pub fn finish(self, cancelled: bool) -> CrawlReport {
        let success = self
            .records
            .first()
            .map(|first| first.depth == 0 && first.success)
            .unwrap_or(false);
        let pages_failed = self.records.iter().filter(|r| !r.success).count();

        CrawlReport {
            success,
            start_url: self.start_url,
            pages_crawled: self.records.len(),
            pages_failed,
            max_depth: self.max_depth,
            max_pages: self.max_pages,
            crawled_at: self.crawled_at,
            cancelled,
            results: self.records,
        }
    }
}
