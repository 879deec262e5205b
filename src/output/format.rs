//! Response format conversion
//!
//! Fetched HTML is stored in the format the caller asked for. Markdown is
//! produced by `htmd`; scripts, styles and the document head are skipped.

use crate::crawler::ParsedPage;
use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, Options};
use htmd::HtmlToMarkdown;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Maximum links listed in the markdown "Found Links" section
pub const MAX_LISTED_LINKS: usize = 50;

/// Maximum images listed in the markdown "Found Images" section
pub const MAX_LISTED_IMAGES: usize = 20;

/// Elements whose text never counts as visible content
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Format of stored page content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Markdown,
    Html,
    Text,
    Json,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Text => "text",
            Self::Json => "json",
        }
    }

    /// MIME type of content stored in this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Markdown => "text/markdown; charset=utf-8",
            Self::Html => "text/html; charset=utf-8",
            Self::Text => "text/plain; charset=utf-8",
            Self::Json => "application/json",
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown response format '{}', expected markdown, html, text or json",
                other
            )),
        }
    }
}

/// Extras appended to markdown output
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatExtras<'a> {
    pub links: Option<&'a [Url]>,
    pub images: Option<&'a [String]>,
}

/// Converts a fetched HTML document into `format`
///
/// # Arguments
///
/// * `html` - The raw document
/// * `url` - URL the document was fetched from
/// * `parsed` - Title and description already extracted from `html`
/// * `format` - Target format
/// * `extras` - Link and image lists for the markdown sections
pub fn format_document(
    html: &str,
    url: &Url,
    parsed: &ParsedPage,
    format: ResponseFormat,
    extras: FormatExtras<'_>,
) -> String {
    match format {
        ResponseFormat::Html => html.to_string(),
        ResponseFormat::Text => html_to_text(html),
        ResponseFormat::Markdown => {
            let mut md = html_to_markdown(html, parsed.title.as_deref());
            append_found_sections(&mut md, extras);
            md
        }
        ResponseFormat::Json => {
            let doc = serde_json::json!({
                "url": url.as_str(),
                "title": parsed.title,
                "description": parsed.description,
                "content": html_to_text(html),
            });
            // Serializing a json! value cannot fail
            serde_json::to_string_pretty(&doc).unwrap_or_default()
        }
    }
}

/// Visible text of the document body, whitespace collapsed
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").ok();
    let root = body_selector
        .as_ref()
        .and_then(|sel| document.select(sel).next())
        .unwrap_or_else(|| document.root_element());

    let mut out = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| HIDDEN_ELEMENTS.contains(&el.value().name()));
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }

    collapse_whitespace(&out)
}

/// Markdown conversion of the whole document, headed by `# {title}`
///
/// Falls back to the visible text if the converter rejects the document.
pub fn html_to_markdown(html: &str, title: Option<&str>) -> String {
    let body = match markdown_converter().convert(html) {
        Ok(md) => md.trim().to_string(),
        Err(e) => {
            tracing::warn!("Markdown conversion failed, storing plain text: {}", e);
            html_to_text(html)
        }
    };

    match title {
        Some(title) if body.is_empty() => format!("# {}", title),
        Some(title) => format!("# {}\n\n{}", title, body),
        None => body,
    }
}

fn markdown_converter() -> HtmlToMarkdown {
    HtmlToMarkdown::builder()
        .skip_tags(HIDDEN_ELEMENTS.to_vec())
        .options(Options {
            heading_style: HeadingStyle::Atx,
            bullet_list_marker: BulletListMarker::Dash,
            code_block_style: CodeBlockStyle::Fenced,
            ..Default::default()
        })
        .build()
}

fn append_found_sections(md: &mut String, extras: FormatExtras<'_>) {
    if let Some(links) = extras.links.filter(|l| !l.is_empty()) {
        md.push_str("\n\n## Found Links\n\n");
        let listed: Vec<String> = links
            .iter()
            .take(MAX_LISTED_LINKS)
            .map(|link| format!("- {}", link))
            .collect();
        md.push_str(&listed.join("\n"));
    }

    if let Some(images) = extras.images.filter(|i| !i.is_empty()) {
        md.push_str("\n\n## Found Images\n\n");
        let listed: Vec<String> = images
            .iter()
            .take(MAX_LISTED_IMAGES)
            .map(|image| format!("- {}", image))
            .collect();
        md.push_str(&listed.join("\n"));
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of `content`, `...` appended when truncated
///
/// # Examples
///
/// ```
/// use webscrape::output::preview;
///
/// assert_eq!(preview("hello world", 5), "hello...");
/// assert_eq!(preview("hello", 5), "hello");
/// ```
pub fn preview(content: &str, max_chars: usize) -> String {
    let mut chars = content.char_indices();
    match chars.nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::parse_html;

    const PAGE: &str = r#"
        <html>
        <head><title>Guide</title><meta name="description" content="A guide"><style>p{}</style></head>
        <body>
            <h1>Intro</h1>
            <p>First   paragraph.</p>
            <ul><li>One</li><li><p>Two</p></li></ul>
            <pre>let x = 1;
let y = 2;</pre>
            <blockquote>Quoted</blockquote>
            <script>var hidden = true;</script>
        </body>
        </html>
    "#;

    fn url() -> Url {
        Url::parse("https://example.com/guide").unwrap()
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("markdown".parse::<ResponseFormat>(), Ok(ResponseFormat::Markdown));
        assert_eq!("HTML".parse::<ResponseFormat>(), Ok(ResponseFormat::Html));
        assert!("pdf".parse::<ResponseFormat>().is_err());
        assert_eq!(ResponseFormat::default(), ResponseFormat::Markdown);
    }

    #[test]
    fn test_html_to_text_skips_scripts() {
        let text = html_to_text(PAGE);
        assert!(text.starts_with("Intro First paragraph. One Two"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("p{}"));
    }

    #[test]
    fn test_html_to_markdown_structure() {
        let md = html_to_markdown(PAGE, Some("Guide"));
        assert!(md.starts_with("# Guide\n\n"));
        assert!(md.contains("# Intro"));
        assert!(md.contains("First paragraph."));
        assert!(md.lines().any(|l| l.starts_with('-') && l.ends_with("One")));
        assert!(md.contains("Two"));
        assert!(md.contains("```"));
        assert!(md.contains("let x = 1;\nlet y = 2;"));
        assert!(md.contains("> Quoted"));
        assert!(!md.contains("hidden"));
        assert!(!md.contains("p{}"));
        // Title comes from the caller, not from <head>
        assert_eq!(md.matches("Guide").count(), 1);
    }

    #[test]
    fn test_html_to_markdown_keeps_text_outside_blocks() {
        let html = "<html><head><title>T</title></head><body>\
            <div>Important body text</div>\
            <table><tr><th>Name</th></tr><tr><td>Cell</td></tr></table>\
            <p>See <a href='/x'>docs</a> <strong>now</strong></p>\
            </body></html>";
        let md = html_to_markdown(html, Some("T"));
        assert!(md.contains("Important body text"));
        assert!(md.contains("Cell"));
        assert!(md.contains("[docs](/x)"));
        assert!(md.contains("now"));
    }

    #[test]
    fn test_html_to_markdown_without_title() {
        let md = html_to_markdown("<p>Just text</p>", None);
        assert_eq!(md, "Just text");
    }

    #[test]
    fn test_markdown_found_sections() {
        let parsed = parse_html(PAGE);
        let links: Vec<Url> = (0..60)
            .map(|i| Url::parse(&format!("https://example.com/{}", i)).unwrap())
            .collect();
        let images = vec!["https://example.com/a.png".to_string()];
        let md = format_document(
            PAGE,
            &url(),
            &parsed,
            ResponseFormat::Markdown,
            FormatExtras {
                links: Some(&links),
                images: Some(&images),
            },
        );

        assert!(md.contains("## Found Links"));
        assert!(md.contains("- https://example.com/49\n"));
        assert!(!md.contains("https://example.com/50\n"));
        assert!(md.ends_with("## Found Images\n\n- https://example.com/a.png"));
    }

    #[test]
    fn test_json_format() {
        let parsed = parse_html(PAGE);
        let json = format_document(
            PAGE,
            &url(),
            &parsed,
            ResponseFormat::Json,
            FormatExtras::default(),
        );
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["url"], "https://example.com/guide");
        assert_eq!(value["title"], "Guide");
        assert_eq!(value["description"], "A guide");
        assert!(value["content"].as_str().unwrap().contains("Quoted"));
    }

    #[test]
    fn test_html_format_is_raw() {
        let parsed = parse_html(PAGE);
        let out = format_document(
            PAGE,
            &url(),
            &parsed,
            ResponseFormat::Html,
            FormatExtras::default(),
        );
        assert_eq!(out, PAGE);
    }

    #[test]
    fn test_preview_counts_characters() {
        assert_eq!(preview("héllo wörld", 7), "héllo w...");
        assert_eq!(preview("", 10), "");
        assert_eq!(preview("abc", 3), "abc");
    }
}
