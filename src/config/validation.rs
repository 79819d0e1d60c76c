use crate::config::types::{Config, CrawlerConfig, HeadlessConfig, OutputConfig, ProxyConfig};
use crate::ConfigError;

/// Proxy schemes the HTTP client can speak
const PROXY_PROTOCOLS: &[&str] = &["http", "https", "socks5"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    if let Some(proxy) = &config.proxy {
        validate_proxy_config(proxy)?;
    }
    validate_headless_config(&config.headless)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.depth < -1 {
        return Err(ConfigError::Validation(format!(
            "depth must be greater than -2, got {}",
            config.depth
        )));
    }

    if config.file_types.is_empty() {
        return Err(ConfigError::Validation(
            "file types can't be empty, set them with --ftypes or in the config file".to_string(),
        ));
    }

    if let Some(bad) = config
        .file_types
        .iter()
        .find(|ext| ext.trim_start_matches('.').is_empty() || ext.contains(char::is_whitespace))
    {
        return Err(ConfigError::Validation(format!(
            "invalid file type {:?}, use a non-empty extension without whitespace",
            bad
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dir.is_empty() {
        return Err(ConfigError::Validation(
            "output dir cannot be empty".to_string(),
        ));
    }

    if matches!(&config.log, Some(log) if log.is_empty()) {
        return Err(ConfigError::Validation(
            "log path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates proxy configuration
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if !PROXY_PROTOCOLS.contains(&config.protocol.as_str()) {
        return Err(ConfigError::InvalidProxy(format!(
            "unsupported proxy type {:?}, supported: http, https, socks5",
            config.protocol
        )));
    }

    if config.address.is_empty() {
        return Err(ConfigError::InvalidProxy(
            "proxy address cannot be empty".to_string(),
        ));
    }

    if config.port == 0 {
        return Err(ConfigError::InvalidProxy(
            "proxy port must be non-zero".to_string(),
        ));
    }

    Ok(())
}

/// Validates headless configuration
fn validate_headless_config(config: &HeadlessConfig) -> Result<(), ConfigError> {
    if config.enable && config.timeout == 0 {
        return Err(ConfigError::Validation(
            "headless timeout must be at least 1 second".to_string(),
        ));
    }
    Ok(())
}
