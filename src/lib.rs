//! Harvester: a concurrent resource crawler
//!
//! This crate walks linked pages from a set of seed URLs up to a depth limit,
//! picks out embedded resources whose file type is on the configured list, and
//! writes them to disk, one directory per host.

pub mod config;
pub mod content;
pub mod crawler;
pub mod output;
pub mod render;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that stop the whole crawl
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Headless browser error: {0}")]
    Render(#[from] render::RenderError),
}

/// Errors that end a single crawl task (or a single inline resource fetch)
/// while the rest of the traversal carries on
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("URL: {url}, HTTP {method} error: {source}")]
    Request {
        url: String,
        method: &'static str,
        source: reqwest::Error,
    },

    #[error("URL: {url}, status text: {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("URL: {url}, unknown Content-Encoding: {encoding}")]
    UnsupportedEncoding { url: String, encoding: String },

    #[error("URL: {url}, uncompress error: {source}")]
    Decompress {
        url: String,
        source: std::io::Error,
    },

    #[error("URL: {url}, invalid media type {value:?}")]
    MediaType { url: String, value: String },

    #[error("URL: {url}, failed to detect charset")]
    CharsetDetection { url: String },

    #[error("URL: {url}, malformed {encoding} content")]
    Decode { url: String, encoding: &'static str },

    #[error("Error writing file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Error writing base64 image file: {0}")]
    InlineAsset(#[from] content::InlineAssetError),

    #[error("URL: {url}, render error: {source}")]
    Render {
        url: String,
        source: render::RenderError,
    },

    #[error("Error resolving ref url: {0}")]
    Url(#[from] UrlError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid proxy: {0}")]
    InvalidProxy(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid HTTP/HTTPS URL: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for fatal crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for per-task operations
pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlOutcome, CrawlTask};
pub use state::TaskState;
