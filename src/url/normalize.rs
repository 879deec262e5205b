use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Href schemes that never produce a fetchable page
const IGNORED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Normalizes a caller-supplied URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything other than http:// and https://
/// 3. Require a host and lowercase it
/// 4. Remove fragment (everything after #)
/// 5. Remove tracking query parameters
/// 6. Sort remaining query parameters alphabetically
///
/// Default ports and dot segments are already dropped by the parser.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use webscrape::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.COM:443/a/../page?b=2&utm_source=x&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url, false)
}

/// Resolves a raw href found on `base` into its canonical form
///
/// Returns `None` for empty hrefs, `javascript:`, `mailto:`, `tel:` and
/// `data:` links, unresolvable references and non-http(s) results.
///
/// # Arguments
///
/// * `base` - URL of the page the href was found on
/// * `raw_href` - The href attribute exactly as written in the document
/// * `keep_fragment` - Keep `#fragment` instead of stripping it
///
/// # Examples
///
/// ```
/// use url::Url;
/// use webscrape::url::canonicalize;
///
/// let base = Url::parse("https://example.com/docs/intro").unwrap();
/// let link = canonicalize(&base, "../about#team", false).unwrap();
/// assert_eq!(link.as_str(), "https://example.com/about");
/// assert!(canonicalize(&base, "mailto:hi@example.com", false).is_none());
/// ```
pub fn canonicalize(base: &Url, raw_href: &str, keep_fragment: bool) -> Option<Url> {
    let href = raw_href.trim();
    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if IGNORED_SCHEMES
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    normalize_parsed(resolved, keep_fragment).ok()
}

fn normalize_parsed(mut url: Url, keep_fragment: bool) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlError::MissingDomain)?
        .to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    if !keep_fragment {
        url.set_fragment(None);
    }

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    // Stable sort keeps repeated keys in document order
    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
