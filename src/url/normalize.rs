use crate::UrlError;
use url::Url;

/// Parses a seed URL given on the command line
///
/// Only absolute `http`/`https` URLs with a host are accepted. The fragment
/// is dropped so the result can be used directly as a dedup key.
///
/// # Examples
///
/// ```
/// use harvester::url::parse_seed;
///
/// let url = parse_seed("http://a.test/page#top").unwrap();
/// assert_eq!(url.as_str(), "http://a.test/page");
/// assert!(parse_seed("ftp://a.test/").is_err());
/// ```
pub fn parse_seed(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{raw}: {e}")))?;
    let url = require_http(url)?;
    Ok(strip_fragment(url))
}

/// Resolves a reference found on a page against the page URL
///
/// Returns the absolute, fragment-free URL. References that resolve to
/// anything other than `http`/`https` are rejected.
///
/// # Examples
///
/// ```
/// use harvester::url::resolve_reference;
/// use url::Url;
///
/// let base = Url::parse("http://a.test/dir/page.html").unwrap();
/// let url = resolve_reference(&base, "../img/pic.jpg#x").unwrap();
/// assert_eq!(url.as_str(), "http://a.test/img/pic.jpg");
/// ```
pub fn resolve_reference(base: &Url, reference: &str) -> Result<Url, UrlError> {
    let url = base
        .join(reference)
        .map_err(|e| UrlError::Parse(format!("{reference}: {e}")))?;
    let url = require_http(url)?;
    Ok(strip_fragment(url))
}

/// Removes the fragment component of a URL
pub fn strip_fragment(mut url: Url) -> Url {
    url.set_fragment(None);
    url
}

fn require_http(url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(url.to_string()));
    }
    Ok(url)
}
