//! Configuration structures for the asset manager client.
//!
//! This module provides configuration types for all components of the SDK:
//!
//! - [`ApiConfig`] - Backend location, timeouts, and retry policy
//! - [`CacheConfig`] - Response cache settings
//! - [`StorageConfig`] - Durable storage location and change synchronisation
//! - [`PaginationConfig`] - Page size defaults for list views
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] with the values the backend
//! is deployed with locally.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding [`ApiConfig::base_url`].
pub const ENV_API_URL: &str = "AM_API_URL";

/// Environment variable overriding [`ApiConfig::timeout_ms`].
pub const ENV_API_TIMEOUT_MS: &str = "AM_API_TIMEOUT_MS";

/// Configuration for the HTTP API client.
///
/// # Examples
///
/// ```
/// use am_core::ApiConfig;
///
/// let config = ApiConfig::default();
/// assert_eq!(config.base_url, "http://localhost:8000");
/// assert_eq!(config.timeout_ms, 30_000);
/// assert_eq!(config.retry_attempts, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every request path is joined to.
    pub base_url: String,

    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Maximum number of attempts made by the retry helper.
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds, doubled on every attempt.
    pub retry_delay_ms: u64,

    /// Requests slower than this are logged at warn level.
    pub slow_request_ms: u64,
}

impl ApiConfig {
    /// Returns the request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the base retry delay as a [`Duration`].
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Returns the slow request threshold as a [`Duration`].
    #[must_use]
    pub const fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            timeout_ms: 30_000,
            retry_attempts: 3,
            retry_delay_ms: 1_000,
            slow_request_ms: 2_000,
        }
    }
}

/// Configuration for the response cache.
///
/// # Examples
///
/// ```
/// use am_core::CacheConfig;
///
/// let config = CacheConfig::default();
/// assert!(config.enabled);
/// assert_eq!(config.ttl_ms, 5 * 60 * 1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether cached GET responses are served at all.
    pub enabled: bool,

    /// Time-to-live of a cache entry in milliseconds.
    pub ttl_ms: u64,
}

impl CacheConfig {
    /// Returns the entry time-to-live as a [`Duration`].
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: 5 * 60 * 1000,
        }
    }
}

/// Configuration for durable client-side storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the JSON file holding stored values.
    pub path: Utf8PathBuf,

    /// Whether stored value handles apply changes made by other handles.
    pub sync_across_instances: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: Utf8PathBuf::from(".assetctl/storage.json"),
            sync_across_instances: true,
        }
    }
}

/// Page size settings for paginated and infinite lists.
///
/// # Examples
///
/// ```
/// use am_core::PaginationConfig;
///
/// let config = PaginationConfig::default();
/// assert_eq!(config.default_page_size, 10);
/// assert!(config.page_size_options.contains(&25));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Page size used when none is requested.
    pub default_page_size: u32,

    /// Page sizes offered to the user.
    pub page_size_options: Vec<u32>,

    /// Largest page size the backend accepts.
    pub max_page_size: u32,

    /// Page size used by infinite lists.
    pub infinite_page_size: u32,

    /// Number of requests settled together by the batch helper.
    pub batch_size: usize,
}

impl PaginationConfig {
    /// Clamps a requested page size into `1..=max_page_size`.
    #[must_use]
    pub fn clamp_size(&self, size: u32) -> u32 {
        size.clamp(1, self.max_page_size.max(1))
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            page_size_options: vec![5, 10, 25, 50, 100],
            max_page_size: 100,
            infinite_page_size: 20,
            batch_size: 5,
        }
    }
}

/// Root configuration for the asset manager client.
///
/// Combines all component configurations into a single structure that can be
/// loaded from a JSON file, overridden from the environment, or constructed
/// programmatically.
///
/// # Examples
///
/// ```
/// use am_core::Config;
///
/// let mut config = Config::default();
/// config.apply_overrides(|key| match key {
///     "AM_API_URL" => Some("https://assets.example.com/api/v1".to_owned()),
///     _ => None,
/// }).unwrap();
/// assert_eq!(config.api.base_url, "https://assets.example.com/api/v1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API client configuration.
    pub api: ApiConfig,

    /// Response cache configuration.
    pub cache: CacheConfig,

    /// Storage configuration.
    pub storage: StorageConfig,

    /// Pagination configuration.
    pub pagination: PaginationConfig,
}

impl Config {
    /// Loads configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the file does not exist,
    /// [`ConfigError::Parse`] if it is not valid JSON, or
    /// [`ConfigError::InvalidOption`] if a value fails validation.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_owned()));
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path` when given, defaults otherwise.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_or_default(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Applies overrides from a variable lookup function.
    ///
    /// Recognised variables are [`ENV_API_URL`] and [`ENV_API_TIMEOUT_MS`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] if a variable holds an unusable value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url.trim().to_owned();
        }
        if let Some(raw) = lookup(ENV_API_TIMEOUT_MS) {
            self.api.timeout_ms = raw.trim().parse().map_err(|_| {
                ConfigError::invalid_option(ENV_API_TIMEOUT_MS, format!("not a number: {raw}"))
            })?;
        }
        self.validate()
    }

    /// Applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::apply_overrides`].
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Checks that every option holds a usable value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the first offending option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.api.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::invalid_option(
                "api.base_url",
                format!("expected an http(s) URL, got '{url}'"),
            ));
        }
        if self.api.timeout_ms == 0 {
            return Err(ConfigError::invalid_option("api.timeout_ms", "must be positive"));
        }
        if self.api.retry_attempts == 0 {
            return Err(ConfigError::invalid_option("api.retry_attempts", "must be at least 1"));
        }
        let pagination = &self.pagination;
        if pagination.default_page_size == 0 || pagination.default_page_size > pagination.max_page_size {
            return Err(ConfigError::invalid_option(
                "pagination.default_page_size",
                format!("must be between 1 and {}", pagination.max_page_size),
            ));
        }
        if pagination.batch_size == 0 {
            return Err(ConfigError::invalid_option("pagination.batch_size", "must be positive"));
        }
        Ok(())
    }
}
