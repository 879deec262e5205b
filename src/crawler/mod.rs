//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Static and script-rendered fetching
//! - HTML parsing and link extraction
//! - The layered breadth-first frontier
//! - Overall crawl coordination and result aggregation

mod aggregator;
mod coordinator;
mod fetcher;
mod parser;
mod processor;
mod scheduler;

pub use aggregator::{CrawlReport, PageRecord, ResultAggregator};
pub use coordinator::{
    run_crawl, Coordinator, CrawlJob, DEFAULT_CRAWL_DEPTH, DEFAULT_CRAWL_PAGES, MAX_CRAWL_DEPTH,
    MAX_CRAWL_PAGES,
};
pub use fetcher::{
    build_http_client, FetchError, FetchMode, FetchedPage, Fetcher, HttpFetcher, RenderedFetcher,
};
pub use parser::{parse_html, ParsedPage};
pub use processor::{capture_page, CaptureOptions, CapturedPage};
pub use scheduler::{Frontier, FrontierEntry, VisitedSet};
