//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client (proxy, cookies, timeout, fixed headers)
//! - GET requests for pages and resources
//! - HEAD requests used before headless rendering
//! - Decompressing bodies the transport left encoded
//!
//! There is no retry logic: every failure ends the current task only.

use crate::config::Config;
use crate::{CrawlError, TaskError, TaskResult};
use bytes::Bytes;
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use mime::Mime;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT_CHARSET, ACCEPT_ENCODING, CONTENT_DISPOSITION,
    CONTENT_ENCODING, CONTENT_TYPE,
};
use reqwest::{Client, Proxy, StatusCode};
use std::io::Read;
use std::time::Duration;
use url::Url;

/// A successful (`200 OK`) response with its body fully read and decoded
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// The URL that was requested
    pub url: Url,

    /// Raw `Content-Type` header value
    pub content_type: Option<String>,

    /// Raw `Content-Disposition` header value
    pub content_disposition: Option<String>,

    /// Body after content decoding
    pub body: Bytes,
}

impl FetchedResponse {
    /// Parses the declared media type
    ///
    /// A missing or unparseable `Content-Type` is an error for the task.
    pub fn media_type(&self) -> TaskResult<Mime> {
        parse_media_type(self.url.as_str(), self.content_type.as_deref())
    }
}

/// Builds an HTTP client with proper configuration
///
/// Every request carries `Accept-Charset: utf-8`, `Accept-Encoding: gzip,
/// deflate` and the configured User-Agent.
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(CrawlError)` - Invalid proxy or client settings
pub fn build_http_client(config: &Config) -> Result<Client, CrawlError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_CHARSET, HeaderValue::from_static("utf-8"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));

    let mut builder = Client::builder()
        .user_agent(config.crawler.user_agent.as_str())
        .default_headers(headers)
        .cookie_store(!config.crawler.disable_cookie);

    if config.crawler.request_timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(config.crawler.request_timeout_secs));
    }

    if let Some(proxy) = &config.proxy {
        tracing::info!("Using {} proxy {}", proxy.protocol, proxy.url());
        builder = builder.proxy(Proxy::all(proxy.url())?);
    }

    Ok(builder.build()?)
}

/// Thin wrapper around the shared client
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the client from configuration
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        build_http_client(config).map(Self::new)
    }

    /// Fetches a URL and returns its decoded body
    ///
    /// # Errors
    ///
    /// * `TaskError::Request` - Transport failure or body read failure
    /// * `TaskError::Status` - Any status other than `200 OK`
    /// * `TaskError::UnsupportedEncoding` / `TaskError::Decompress` - Body decoding failed
    pub async fn fetch(&self, url: &Url) -> TaskResult<FetchedResponse> {
        let request_error = |source| TaskError::Request {
            url: url.to_string(),
            method: "GET",
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(request_error)?;

        if response.status() != StatusCode::OK {
            return Err(TaskError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let headers = response.headers();
        let content_type = header_string(headers, CONTENT_TYPE);
        let content_disposition = header_string(headers, CONTENT_DISPOSITION);
        let content_encoding = header_string(headers, CONTENT_ENCODING);

        let raw = response.bytes().await.map_err(request_error)?;
        let body = decompress(url.as_str(), content_encoding.as_deref(), raw)?;

        Ok(FetchedResponse {
            url: url.clone(),
            content_type,
            content_disposition,
            body,
        })
    }

    /// Sends a HEAD request and returns the declared media type, if any
    ///
    /// Only a transport failure is an error; a status other than `200 OK` or
    /// a missing or unparseable `Content-Type` yields `None`.
    pub async fn head_media_type(&self, url: &Url) -> TaskResult<Option<Mime>> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|source| TaskError::Request {
                url: url.to_string(),
                method: "HEAD",
                source,
            })?;

        if response.status() != StatusCode::OK {
            tracing::debug!("{}: HEAD returned {}", url, response.status());
            return Ok(None);
        }

        let content_type = header_string(response.headers(), CONTENT_TYPE);
        Ok(content_type.and_then(|v| v.parse::<Mime>().ok()))
    }
}

/// Undoes a `Content-Encoding` the transport did not already handle
///
/// `deflate` is tried as a zlib stream first, then as raw deflate, since
/// servers send both under that name.
pub fn decompress(url: &str, encoding: Option<&str>, body: Bytes) -> TaskResult<Bytes> {
    let encoding = encoding.map(|e| e.trim().to_ascii_lowercase());

    let decoded = match encoding.as_deref() {
        None | Some("") | Some("identity") => return Ok(body),
        Some("gzip") | Some("x-gzip") => read_all(GzDecoder::new(&body[..])),
        Some("deflate") => {
            read_all(ZlibDecoder::new(&body[..])).or_else(|_| read_all(DeflateDecoder::new(&body[..])))
        }
        Some(other) => {
            return Err(TaskError::UnsupportedEncoding {
                url: url.to_string(),
                encoding: other.to_string(),
            })
        }
    };

    decoded.map(Bytes::from).map_err(|source| TaskError::Decompress {
        url: url.to_string(),
        source,
    })
}

fn read_all(mut reader: impl Read) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out)?;
    Ok(out)
}

fn parse_media_type(url: &str, value: Option<&str>) -> TaskResult<Mime> {
    let value = value.unwrap_or_default();
    value.parse::<Mime>().map_err(|_| TaskError::MediaType {
        url: url.to_string(),
        value: value.to_string(),
    })
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BODY: &[u8] = b"<html><body>compressed</body></html>";

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn raw_deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn test_fetcher() -> Fetcher {
        Fetcher::from_config(&Config::default()).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&Config::default()).is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let mut config = Config::default();
        config.proxy = Some(crate::config::ProxyConfig {
            protocol: "socks5".to_string(),
            address: "127.0.0.1".to_string(),
            port: 1080,
        });
        assert!(build_http_client(&config).is_ok());
    }

    #[test]
    fn test_identity_passes_through() {
        let body = Bytes::from_static(BODY);
        assert_eq!(decompress("u", None, body.clone()).unwrap(), body);
        assert_eq!(decompress("u", Some("identity"), body.clone()).unwrap(), body);
    }

    #[test]
    fn test_gzip() {
        let out = decompress("u", Some("gzip"), Bytes::from(gzip(BODY))).unwrap();
        assert_eq!(&out[..], BODY);
    }

    #[test]
    fn test_deflate_zlib_and_raw() {
        let out = decompress("u", Some("deflate"), Bytes::from(zlib(BODY))).unwrap();
        assert_eq!(&out[..], BODY);

        let out = decompress("u", Some("Deflate"), Bytes::from(raw_deflate(BODY))).unwrap();
        assert_eq!(&out[..], BODY);
    }

    #[test]
    fn test_unknown_encoding() {
        let err = decompress("u", Some("compress"), Bytes::from_static(BODY)).unwrap_err();
        assert!(matches!(err, TaskError::UnsupportedEncoding { encoding, .. } if encoding == "compress"));
    }

    #[test]
    fn test_corrupt_gzip() {
        let err = decompress("u", Some("gzip"), Bytes::from_static(b"not gzip")).unwrap_err();
        assert!(matches!(err, TaskError::Decompress { .. }));
    }

    #[tokio::test]
    async fn test_fetch_sends_fixed_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("accept-charset", "utf-8"))
            .and(header_exists("accept-encoding"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<p>hi</p>", "text/html; charset=utf-8"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let response = test_fetcher().fetch(&url).await.unwrap();

        assert_eq!(&response.body[..], b"<p>hi</p>");
        let mime = response.media_type().unwrap();
        assert_eq!(mime.essence_str(), "text/html");
        assert_eq!(mime.get_param(mime::CHARSET).unwrap().as_str(), "utf-8");
    }

    #[tokio::test]
    async fn test_fetch_decodes_deflate_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-encoding", "deflate")
                    .set_body_raw(zlib(BODY), "text/html"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let response = test_fetcher().fetch(&url).await.unwrap();
        assert_eq!(&response.body[..], BODY);
    }

    #[tokio::test]
    async fn test_non_ok_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = test_fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(err, TaskError::Status { status, .. } if status == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_other_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        assert!(matches!(
            test_fetcher().fetch(&url).await,
            Err(TaskError::Status { .. })
        ));
    }

    #[test]
    fn test_missing_or_invalid_content_type_is_media_type_error() {
        assert!(matches!(
            parse_media_type("u", None),
            Err(TaskError::MediaType { .. })
        ));
        assert!(matches!(
            parse_media_type("u", Some("not a media type")),
            Err(TaskError::MediaType { value, .. }) if value == "not a media type"
        ));
    }

    #[tokio::test]
    async fn test_head_media_type() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let mime = test_fetcher().head_media_type(&url).await.unwrap().unwrap();
        assert_eq!(mime.essence_str(), "text/html");
    }

    #[tokio::test]
    async fn test_head_error_status_is_not_html() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(405).insert_header("content-type", "text/html"))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        assert!(test_fetcher().head_media_type(&url).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connection_failure_is_request_error() {
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        assert!(matches!(
            test_fetcher().fetch(&url).await,
            Err(TaskError::Request { method: "GET", .. })
        ));
    }
}
