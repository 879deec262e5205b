//! URL handling module for webscrape
//!
//! This module provides URL normalization, href canonicalization,
//! registrable-domain extraction, and internal/external link classification.

mod domain;
mod normalize;

use url::Url;

// Re-export main functions
pub use domain::{extract_domain, registrable_domain};
pub use normalize::{canonicalize, normalize_url};

/// Where a link points relative to the page it was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkScope {
    /// Same registrable domain as the page (subdomains included)
    Internal,
    /// Any other site
    External,
}

impl LinkScope {
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Classifies `link` against the site of `page`
///
/// Scheme and port are ignored; only the registrable domain is compared.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use webscrape::url::{classify_link, LinkScope};
///
/// let page = Url::parse("https://example.com/").unwrap();
/// let blog = Url::parse("http://blog.example.com/post").unwrap();
/// let other = Url::parse("https://other.com/x").unwrap();
///
/// assert_eq!(classify_link(&page, &blog), LinkScope::Internal);
/// assert_eq!(classify_link(&page, &other), LinkScope::External);
/// ```
pub fn classify_link(page: &Url, link: &Url) -> LinkScope {
    match (registrable_domain(page), registrable_domain(link)) {
        (Some(a), Some(b)) if a == b => LinkScope::Internal,
        _ => LinkScope::External,
    }
}
