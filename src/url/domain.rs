use std::net::IpAddr;
use url::{Host, Url};

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use webscrape::url::extract_domain;
///
/// let url = Url::parse("https://Sub.Example.com:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the registrable domain of a URL's host
///
/// The registrable domain is one label below the host's public suffix, as
/// listed in the Public Suffix List (private section included). Subdomains
/// collapse onto it (`blog.example.com` yields `example.com`,
/// `shop.example.co.uk` yields `example.co.uk`), while hosting suffixes keep
/// tenants apart (`alice.github.io` and `bob.github.io` differ). IP
/// addresses, single-label hosts such as `localhost` and hosts that are
/// themselves a public suffix are returned whole.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use webscrape::url::registrable_domain;
///
/// let url = Url::parse("http://docs.example.com:8080/").unwrap();
/// assert_eq!(registrable_domain(&url).as_deref(), Some("example.com"));
/// ```
pub fn registrable_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
        Host::Domain(_) => extract_domain(url).map(|host| registrable_from_host(&host)),
    }
}

fn registrable_from_host(host: &str) -> String {
    let host = host.trim_end_matches('.').to_string();
    if host.parse::<IpAddr>().is_ok() {
        return host;
    }

    match addr::parse_domain_name(&host) {
        Ok(name) => name.root().map(str::to_string).unwrap_or(host),
        Err(e) => {
            tracing::debug!("No public suffix for {}: {}", host, e);
            host
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(s: &str) -> Option<String> {
        registrable_domain(&Url::parse(s).unwrap())
    }

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_uppercase_converted_to_lowercase() {
        let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_registrable_bare_domain() {
        assert_eq!(reg("https://example.com/").as_deref(), Some("example.com"));
    }

    #[test]
    fn test_registrable_subdomains() {
        assert_eq!(reg("https://blog.example.com/").as_deref(), Some("example.com"));
        assert_eq!(
            reg("https://api.v2.example.com/").as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn test_registrable_compound_suffix() {
        assert_eq!(
            reg("https://shop.example.co.uk/").as_deref(),
            Some("example.co.uk")
        );
        assert_eq!(reg("https://example.com.au/").as_deref(), Some("example.com.au"));
    }

    #[test]
    fn test_registrable_hosting_suffix_keeps_tenants_apart() {
        assert_eq!(
            reg("https://alice.github.io/blog").as_deref(),
            Some("alice.github.io")
        );
        assert_ne!(reg("https://alice.github.io/"), reg("https://bob.github.io/"));
        assert_eq!(reg("https://github.io/").as_deref(), Some("github.io"));
    }

    #[test]
    fn test_registrable_ip_and_single_label() {
        assert_eq!(reg("http://127.0.0.1:3000/").as_deref(), Some("127.0.0.1"));
        assert_eq!(reg("http://localhost:8080/").as_deref(), Some("localhost"));
    }

    #[test]
    fn test_registrable_ignores_scheme_and_port() {
        assert_eq!(reg("http://example.com:81/"), reg("https://www.example.com/"));
    }
}
