//! Tool results, serialized as the JSON returned to callers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link, image and metadata counts for one scrape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeStats {
    pub total_links: usize,
    pub total_images: usize,
    pub has_metadata: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeUrlResult {
    pub success: bool,
    pub scrape_id: String,
    pub url: String,
    pub resource_uri: String,
    pub metadata_uri: String,
    pub preview: String,
    /// Byte length of the stored content
    pub content_length: usize,
    pub format: String,
    /// Absent for rendered scrapes
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub stats: ScrapeStats,
}

/// One URL of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEntry {
    pub(crate) fn failed(url: &str, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            scrape_id: None,
            resource_uri: None,
            preview: None,
            content_length: None,
            status_code: None,
            title: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeMultipleResult {
    /// False only when every URL failed
    pub success: bool,
    pub total_urls: usize,
    pub successful: usize,
    pub failed: usize,
    pub scraped_at: DateTime<Utc>,
    pub results: Vec<BatchEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractLinksResult {
    pub success: bool,
    pub url: String,
    pub total_links: usize,
    pub internal_links_count: usize,
    pub external_links_count: usize,
    pub extracted_at: DateTime<Utc>,
    pub internal_links: Vec<String>,
    /// Empty when `same_domain_only` was requested
    pub external_links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeWithJsResult {
    #[serde(flatten)]
    pub scrape: ScrapeUrlResult,
    pub rendering_method: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotResult {
    pub success: bool,
    pub scrape_id: String,
    pub url: String,
    pub title: Option<String>,
    pub resource_uri: String,
    pub viewport: Viewport,
    pub full_page: bool,
    pub screenshot_size_bytes: usize,
    pub captured_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub note: String,
}

/// Payload behind a resource URI
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceContent {
    /// Stored content bytes
    Content {
        scrape_id: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
    /// Metadata document
    Metadata(serde_json::Value),
}

impl ResourceContent {
    pub fn mime_type(&self) -> &str {
        match self {
            Self::Content { mime_type, .. } => mime_type,
            Self::Metadata(_) => "application/json",
        }
    }

    /// Returns true when the payload is text that can be printed as-is
    pub fn is_text(&self) -> bool {
        match self {
            Self::Content { mime_type, .. } => {
                mime_type.starts_with("text/") || mime_type.starts_with("application/json")
            }
            Self::Metadata(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_result_flattens_scrape_fields() {
        let now = Utc::now();
        let result = ScrapeWithJsResult {
            scrape: ScrapeUrlResult {
                success: true,
                scrape_id: "abc".to_string(),
                url: "https://example.com/".to_string(),
                resource_uri: "scrape://abc/content".to_string(),
                metadata_uri: "scrape://abc/metadata".to_string(),
                preview: "hi".to_string(),
                content_length: 2,
                format: "text".to_string(),
                status_code: None,
                title: None,
                description: None,
                scraped_at: now,
                expires_at: now,
                stats: ScrapeStats {
                    total_links: 0,
                    total_images: 0,
                    has_metadata: false,
                },
            },
            rendering_method: "javascript".to_string(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["rendering_method"], "javascript");
        assert_eq!(json["resource_uri"], "scrape://abc/content");
        assert!(json["status_code"].is_null());
        assert!(json.get("title").is_none());
        assert!(json.get("scrape").is_none());
    }

    #[test]
    fn test_failed_batch_entry_serialization() {
        let entry = BatchEntry::failed("https://example.com/x", "HTTP 404 Not Found");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "HTTP 404 Not Found");
        assert!(json.get("scrape_id").is_none());
    }

    #[test]
    fn test_resource_content_text_detection() {
        let content = ResourceContent::Content {
            scrape_id: "a".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![0x89],
        };
        assert!(!content.is_text());
        assert!(ResourceContent::Metadata(serde_json::json!({})).is_text());
    }
}
