//! Turning a fetched page into a stored resource
//!
//! Shared by the crawl coordinator and the single-page tools: parse the
//! document, convert it to the requested format, and put it in the store.

use crate::crawler::fetcher::{FetchMode, FetchedPage};
use crate::crawler::parser::{parse_html, ParsedPage};
use crate::output::{format_document, FormatExtras, ResponseFormat};
use crate::store::{ResourceHandle, ResourceMetadata, ResourceStore, StoreResult};
use url::Url;

/// How a fetched page is converted before storing
#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    pub format: ResponseFormat,
    /// Append the "Found Links" section to markdown output
    pub include_links: bool,
    /// Append the "Found Images" section to markdown output
    pub include_images: bool,
    pub mode: FetchMode,
}

impl CaptureOptions {
    pub fn new(format: ResponseFormat, mode: FetchMode) -> Self {
        Self {
            format,
            include_links: false,
            include_images: false,
            mode,
        }
    }
}

/// A page after it has been stored
#[derive(Debug, Clone)]
pub struct CapturedPage {
    pub handle: ResourceHandle,
    pub parsed: ParsedPage,
    /// Stored content, lossily decoded
    pub content: String,
    /// Byte length of the stored content
    pub content_length: usize,
    /// Canonical outbound links, fragments stripped, document order
    pub links: Vec<Url>,
    pub images: Vec<String>,
    pub is_html: bool,
}

/// Parses, converts and stores a fetched page
///
/// Non-HTML bodies are stored byte-for-byte and contribute no links.
///
/// # Arguments
///
/// * `store` - Destination resource store
/// * `page` - The fetched page
/// * `options` - Target format and extras
///
/// # Returns
///
/// * `Ok(CapturedPage)` - The stored page with its handle
/// * `Err(StoreError)` - The store rejected the write
pub fn capture_page(
    store: &dyn ResourceStore,
    page: &FetchedPage,
    options: &CaptureOptions,
) -> StoreResult<CapturedPage> {
    let is_html = page.is_html();

    let (parsed, links, images, content_bytes, format, mime_type) = if is_html {
        let html = page.text();
        let parsed = parse_html(&html);
        let links = parsed.links(&page.final_url, false);
        let images = parsed.images(&page.final_url);

        let extras = FormatExtras {
            links: options.include_links.then_some(links.as_slice()),
            images: options.include_images.then_some(images.as_slice()),
        };
        let content = format_document(&html, &page.final_url, &parsed, options.format, extras);

        (
            parsed,
            links,
            images,
            content.into_bytes(),
            options.format.as_str().to_string(),
            options.format.mime_type().to_string(),
        )
    } else {
        tracing::debug!(
            "Storing non-HTML content from {} as-is ({:?})",
            page.url,
            page.content_type
        );
        (
            ParsedPage::default(),
            Vec::new(),
            Vec::new(),
            page.body.clone(),
            "raw".to_string(),
            page.content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        )
    };

    let content_length = content_bytes.len();
    let content = String::from_utf8_lossy(&content_bytes).into_owned();

    let metadata = ResourceMetadata {
        url: page.url.to_string(),
        title: parsed.title.clone(),
        description: parsed.description.clone(),
        format,
        mime_type,
        status_code: page.status_code,
        links: links.iter().map(|u| u.to_string()).collect(),
        images: images.clone(),
        content_length,
        rendering_method: Some(options.mode.rendering_method().to_string()),
    };

    let handle = store.put(content_bytes, metadata)?;

    Ok(CapturedPage {
        handle,
        parsed,
        content,
        content_length,
        links,
        images,
        is_html,
    })
}
