//! Output module for formatting scraped content and crawl reports
//!
//! This module handles:
//! - Converting fetched HTML into the requested response format
//! - Content previews
//! - Generating markdown summaries of crawl results

mod format;
mod markdown;

pub use format::{
    format_document, html_to_markdown, html_to_text, preview, FormatExtras, ResponseFormat,
    MAX_LISTED_IMAGES, MAX_LISTED_LINKS,
};
pub use markdown::{format_crawl_summary, write_crawl_summary};
