use serde::Deserialize;

/// Default User-Agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; harvester/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Main configuration structure for Harvester
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    pub proxy: Option<ProxyConfig>,
    pub headless: HeadlessConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Crawl depth: -1 is unlimited, 0 crawls nothing, 1 fetches the seeds only
    pub depth: i32,

    /// Maximum number of pages processed at once (0 means unbounded)
    pub max_concurrency: usize,

    /// Follow links that leave the host of the page they were found on
    pub external_webpages: bool,

    /// File extensions to grab, with or without a leading dot
    pub file_types: Vec<String>,

    /// User-Agent header value
    pub user_agent: String,

    /// Per-request timeout in seconds (0 disables the timeout)
    pub request_timeout_secs: u64,

    /// Disable the cookie store
    pub disable_cookie: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            depth: 1,
            max_concurrency: 0,
            external_webpages: false,
            file_types: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 0,
            disable_cookie: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives one subdirectory per crawled host
    pub dir: String,

    /// Optional log file; log lines go to stdout when unset
    pub log: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            log: None,
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyConfig {
    /// One of `http`, `https` or `socks5`
    pub protocol: String,
    pub address: String,
    pub port: u16,
}

impl ProxyConfig {
    /// Formats the proxy as a URL understood by the HTTP client
    pub fn url(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("{}://[{}]:{}", self.protocol, self.address, self.port)
        } else {
            format!("{}://{}:{}", self.protocol, self.address, self.port)
        }
    }
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    pub enable: bool,

    /// Render timeout in seconds
    pub timeout: u64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            enable: false,
            timeout: 10,
        }
    }
}

/// Values given on the command line; each one that is set wins over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub depth: Option<i32>,
    pub max_concurrency: Option<usize>,
    pub external_webpages: bool,
    pub file_types: Vec<String>,
    pub dir: Option<String>,
    pub log: Option<String>,
    pub proxy: Option<String>,
    pub headless: bool,
    pub disable_cookie: bool,
}
