use url::Url;

/// Extracts the host from a URL, lowercased and without the port
///
/// # Examples
///
/// ```
/// use url::Url;
/// use harvester::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.com:8080/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true when both URLs point at the same host name
///
/// Ports and schemes are ignored, mirroring a plain host-name comparison.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (extract_host(a), extract_host(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
