//! Configuration module for Harvester
//!
//! This module handles loading and validating the TOML configuration file and
//! layering command-line overrides on top of it.
//!
//! # Example
//!
//! ```no_run
//! use harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Crawler will use depth: {}", config.crawler.depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ConfigOverrides, CrawlerConfig, HeadlessConfig, OutputConfig, ProxyConfig,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{
    apply_overrides, compute_config_hash, load_config, parse_proxy, read_config, resolve_config,
    split_file_types,
};
pub use validation::validate;
