//! Pipeline configuration.
//!
//! This module provides the settings for a run: where the catalog lives,
//! how hard to retry, how much to run in parallel, and where the cache and
//! output artifacts are stored.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::collectors::{DEFAULT_BASE_URL, DEFAULT_MAX_PAGES};
use crate::fetch::RetryPolicy;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Source settings
    /// Base URL of the catalog API.
    pub base_url: String,
    /// Timeout for a single HTTP request.
    pub request_timeout: Duration,
    /// Maximum number of list pages to follow.
    pub max_pages: usize,

    // Execution settings
    /// Maximum number of items fetched concurrently.
    pub max_concurrency: usize,
    /// Retries of transient failures after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_base_delay: Duration,
    /// Upper bound on a single retry delay.
    pub retry_max_delay: Duration,

    // Storage settings
    /// SQLite database holding memoized call results.
    pub cache_path: PathBuf,
    /// Whether the catalog listing is memoized per day.
    pub cache_catalog: bool,
    /// Records artifact.
    pub output_path: PathBuf,
    /// Whether a `.report.json` sidecar is written next to the artifact.
    pub write_report: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            max_pages: DEFAULT_MAX_PAGES,

            max_concurrency: 4,
            max_retries: 2,
            retry_base_delay: Duration::from_millis(1000),
            retry_max_delay: Duration::from_secs(10),

            cache_path: PathBuf::from("monster_cache.db"),
            cache_catalog: true,
            output_path: PathBuf::from("monsters.json"),
            write_report: true,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MONSTER_FORGE_BASE_URL`: Catalog API base URL (default: https://www.dnd5eapi.co)
    /// - `MONSTER_FORGE_TIMEOUT_SECS`: HTTP request timeout in seconds (default: 30)
    /// - `MONSTER_FORGE_MAX_PAGES`: Maximum list pages to follow (default: 100)
    /// - `MONSTER_FORGE_CONCURRENCY`: Concurrent item fetches (default: 4)
    /// - `MONSTER_FORGE_MAX_RETRIES`: Retries of transient failures (default: 2)
    /// - `MONSTER_FORGE_RETRY_BASE_MS`: First retry delay in ms (default: 1000)
    /// - `MONSTER_FORGE_RETRY_MAX_MS`: Retry delay cap in ms (default: 10000)
    /// - `MONSTER_FORGE_CACHE_DB`: Cache database path (default: monster_cache.db)
    /// - `MONSTER_FORGE_CACHE_CATALOG`: Memoize the daily listing (default: true)
    /// - `MONSTER_FORGE_OUTPUT`: Records artifact path (default: monsters.json)
    /// - `MONSTER_FORGE_WRITE_REPORT`: Write the run report sidecar (default: true)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Source settings
        if let Ok(val) = std::env::var("MONSTER_FORGE_BASE_URL") {
            config.base_url = val;
        }

        if let Ok(val) = std::env::var("MONSTER_FORGE_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "MONSTER_FORGE_TIMEOUT_SECS")?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("MONSTER_FORGE_MAX_PAGES") {
            config.max_pages = parse_env_value(&val, "MONSTER_FORGE_MAX_PAGES")?;
        }

        // Execution settings
        if let Ok(val) = std::env::var("MONSTER_FORGE_CONCURRENCY") {
            config.max_concurrency = parse_env_value(&val, "MONSTER_FORGE_CONCURRENCY")?;
        }

        if let Ok(val) = std::env::var("MONSTER_FORGE_MAX_RETRIES") {
            config.max_retries = parse_env_value(&val, "MONSTER_FORGE_MAX_RETRIES")?;
        }

        if let Ok(val) = std::env::var("MONSTER_FORGE_RETRY_BASE_MS") {
            let ms: u64 = parse_env_value(&val, "MONSTER_FORGE_RETRY_BASE_MS")?;
            config.retry_base_delay = Duration::from_millis(ms);
        }

        if let Ok(val) = std::env::var("MONSTER_FORGE_RETRY_MAX_MS") {
            let ms: u64 = parse_env_value(&val, "MONSTER_FORGE_RETRY_MAX_MS")?;
            config.retry_max_delay = Duration::from_millis(ms);
        }

        // Storage settings
        if let Ok(val) = std::env::var("MONSTER_FORGE_CACHE_DB") {
            config.cache_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("MONSTER_FORGE_CACHE_CATALOG") {
            config.cache_catalog = parse_env_bool(&val, "MONSTER_FORGE_CACHE_CATALOG")?;
        }

        if let Ok(val) = std::env::var("MONSTER_FORGE_OUTPUT") {
            config.output_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("MONSTER_FORGE_WRITE_REPORT") {
            config.write_report = parse_env_bool(&val, "MONSTER_FORGE_WRITE_REPORT")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "base_url cannot be empty".to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::ValidationFailed(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_pages == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_pages must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrency == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(ConfigError::ValidationFailed(format!(
                "max_concurrency cannot exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }

        if self.retry_base_delay > self.retry_max_delay {
            return Err(ConfigError::ValidationFailed(
                "retry_base_delay cannot exceed retry_max_delay".to_string(),
            ));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "output_path cannot be empty".to_string(),
            ));
        }

        if self.cache_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "cache_path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Retry policy derived from the retry settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_base_delay, self.retry_max_delay)
    }

    /// Builder method to set the catalog base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder method to set the HTTP request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages = max;
        self
    }

    /// Builder method to set max concurrent item fetches.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Builder method to set the retry delays.
    pub fn with_retry_delays(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay = base;
        self.retry_max_delay = max;
        self
    }

    /// Builder method to set the cache database path.
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    pub fn with_catalog_cache(mut self, enabled: bool) -> Self {
        self.cache_catalog = enabled;
        self
    }

    /// Builder method to set the records artifact path.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_report(mut self, enabled: bool) -> Self {
        self.write_report = enabled;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}
