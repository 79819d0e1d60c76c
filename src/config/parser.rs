use crate::config::types::{Config, ConfigOverrides, ProxyConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use url::Url;

/// Reads and parses a configuration file without validating it
///
/// Validation is deferred so that command-line overrides can still fill in
/// values the file leaves out.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
}

/// Loads, parses and validates a configuration file
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use harvester::config::load_config;
///
/// let config = load_config(Path::new("harvester.toml")).unwrap();
/// println!("Depth: {}", config.crawler.depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config = read_config(path)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Builds the effective configuration for a run
///
/// Reads the optional file, applies the command-line overrides on top and
/// validates the result. Returns the configuration together with the file hash
/// when a file was given.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<(Config, Option<String>), ConfigError> {
    let (mut config, hash) = match path {
        Some(path) => (read_config(path)?, Some(compute_config_hash(path)?)),
        None => (Config::default(), None),
    };

    apply_overrides(&mut config, overrides)?;
    validate(&config)?;

    Ok((config, hash))
}

/// Applies command-line values on top of a configuration
pub fn apply_overrides(config: &mut Config, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
    if let Some(depth) = overrides.depth {
        config.crawler.depth = depth;
    }
    if let Some(max_concurrency) = overrides.max_concurrency {
        config.crawler.max_concurrency = max_concurrency;
    }
    if overrides.external_webpages {
        config.crawler.external_webpages = true;
    }
    if !overrides.file_types.is_empty() {
        config.crawler.file_types = overrides.file_types.clone();
    }
    if let Some(dir) = &overrides.dir {
        config.output.dir = dir.clone();
    }
    if let Some(log) = &overrides.log {
        config.output.log = Some(log.clone());
    }
    if let Some(proxy) = &overrides.proxy {
        config.proxy = Some(parse_proxy(proxy)?);
    }
    if overrides.headless {
        config.headless.enable = true;
    }
    if overrides.disable_cookie {
        config.crawler.disable_cookie = true;
    }
    Ok(())
}

/// Parses a proxy given as a URL, e.g. `socks5://127.0.0.1:1080`
pub fn parse_proxy(raw: &str) -> Result<ProxyConfig, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidProxy(format!("{raw}: {e}")))?;

    let address = url
        .host_str()
        .ok_or_else(|| ConfigError::InvalidProxy(format!("{raw}: missing host")))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();

    let port = url
        .port_or_known_default()
        .or(match url.scheme() {
            "socks5" => Some(1080),
            _ => None,
        })
        .ok_or_else(|| ConfigError::InvalidProxy(format!("{raw}: missing port")))?;

    Ok(ProxyConfig {
        protocol: url.scheme().to_string(),
        address,
        port,
    })
}

/// Splits a comma-separated list of file types, dropping empty entries
pub fn split_file_types(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
