//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Page title and meta description
//! - Link hrefs, exactly as written, in document order
//! - Image sources

use crate::url::canonicalize;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Content of `<meta name="description">`
    pub description: Option<String>,

    /// Raw `href` values of `<a>` tags, in document order
    pub hrefs: Vec<String>,

    /// Raw `src` values of `<img>` tags, in document order
    pub image_sources: Vec<String>,
}

impl ParsedPage {
    /// Canonical link targets, first occurrence wins
    ///
    /// # Arguments
    ///
    /// * `base_url` - URL the document was fetched from
    /// * `keep_fragment` - Keep `#fragment` so anchors on one page stay distinct
    pub fn links(&self, base_url: &Url, keep_fragment: bool) -> Vec<Url> {
        let mut seen = HashSet::new();
        self.hrefs
            .iter()
            .filter_map(|href| canonicalize(base_url, href, keep_fragment))
            .filter(|url| seen.insert(url.as_str().to_string()))
            .collect()
    }

    /// Absolute image URLs, duplicates removed
    pub fn images(&self, base_url: &Url) -> Vec<String> {
        let mut seen = HashSet::new();
        self.image_sources
            .iter()
            .filter_map(|src| base_url.join(src.trim()).ok())
            .filter(|url| url.scheme() == "http" || url.scheme() == "https")
            .map(|url| url.to_string())
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `<link>`, `<script src>` and other non-anchor references
///
/// Scheme filtering (`javascript:`, `mailto:`, `tel:`, `data:`) happens when
/// hrefs are canonicalized, see [`ParsedPage::links`].
///
/// # Example
///
/// ```
/// use webscrape::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links(&base_url, false)[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        description: extract_description(&document),
        hrefs: extract_attr(&document, "a[href]", "href"),
        image_sources: extract_attr(&document, "img[src]", "src"),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name='description'], meta[property='og:description']")
        .ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|s| !s.is_empty())
}

fn extract_attr(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        // Skip download links
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr(attr))
        .map(|value| value.to_string())
        .collect()
}
