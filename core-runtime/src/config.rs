//! # Core Configuration Module
//!
//! Configuration for the catalog core.
//!
//! ## Overview
//!
//! A builder produces a `CoreConfig` holding the backend location, the host
//! `HttpClient` bridge and the timing knobs used by the query engine, the
//! batch orchestrator and the crawl monitor. Validation is fail-fast: `build()`
//! refuses to hand out a config that would misbehave later.
//!
//! ## Required
//!
//! - `api_base_url` - backend root, e.g. `http://localhost:8000`
//!
//! ## Optional (with defaults)
//!
//! - `HttpClient` - desktop default: reqwest (`desktop-shims` feature)
//! - `request_timeout` - 10 s
//! - `page_size` - 15
//! - `search_debounce` - 300 ms
//! - `settle_delay` - 300 ms
//! - `batch_item_spacing` - 100 ms
//! - `crawl_poll_interval` - 5 s
//! - `zone_definition_path` - none (built-in definition is used)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("http://localhost:8000")
//!     .page_size(20)
//!     .search_debounce(Duration::from_millis(250))
//!     .build()?;
//! ```
//!
//! Or from the process environment:
//!
//! ```ignore
//! // CATALOG_API_BASE_URL=http://localhost:8000 CATALOG_PAGE_SIZE=20
//! let config = core_runtime::config::CoreConfig::from_env()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::HttpClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PAGE_SIZE: u32 = 15;
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);
pub const DEFAULT_BATCH_ITEM_SPACING: Duration = Duration::from_millis(100);
pub const DEFAULT_CRAWL_POLL_INTERVAL: Duration = Duration::from_secs(5);

const MAX_PAGE_SIZE: u32 = 200;
const MAX_UI_DELAY: Duration = Duration::from_secs(5);
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub const ENV_API_BASE_URL: &str = "CATALOG_API_BASE_URL";
pub const ENV_API_TIMEOUT_MS: &str = "CATALOG_API_TIMEOUT_MS";
pub const ENV_PAGE_SIZE: &str = "CATALOG_PAGE_SIZE";
pub const ENV_DEBOUNCE_MS: &str = "CATALOG_DEBOUNCE_MS";
pub const ENV_SETTLE_MS: &str = "CATALOG_SETTLE_MS";
pub const ENV_BATCH_SPACING_MS: &str = "CATALOG_BATCH_SPACING_MS";
pub const ENV_CRAWL_POLL_MS: &str = "CATALOG_CRAWL_POLL_MS";
pub const ENV_ZONES_PATH: &str = "CATALOG_ZONES_PATH";

/// Core configuration for the catalog core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Backend root without the `/api` suffix, trailing slash stripped
    pub api_base_url: String,

    /// HTTP bridge used by the catalog gateway
    pub http_client: Arc<dyn HttpClient>,

    /// Per-request timeout handed to the HTTP bridge
    pub request_timeout: Duration,

    /// Records per page in the catalog view
    pub page_size: u32,

    /// Quiet period before a search keyword is applied
    pub search_debounce: Duration,

    /// Minimum time a query stays "in flight" for display purposes
    pub settle_delay: Duration,

    /// Minimum spacing between batch detail updates
    pub batch_item_spacing: Duration,

    /// Crawl status poll period
    pub crawl_poll_interval: Duration,

    /// Zone definition JSON to load instead of the built-in one
    pub zone_definition_path: Option<PathBuf>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("http_client", &"HttpClient { ... }")
            .field("request_timeout", &self.request_timeout)
            .field("page_size", &self.page_size)
            .field("search_debounce", &self.search_debounce)
            .field("settle_delay", &self.settle_delay)
            .field("batch_item_spacing", &self.batch_item_spacing)
            .field("crawl_poll_interval", &self.crawl_poll_interval)
            .field("zone_definition_path", &self.zone_definition_path)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Builds a config from `CATALOG_*` environment variables.
    ///
    /// Unset variables fall back to the defaults; values that are set but
    /// unparsable are rejected. The HTTP client is the platform default.
    pub fn from_env() -> Result<Self> {
        CoreConfigBuilder::from_lookup(|key| std::env::var(key).ok())?.build()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        validate_base_url(&self.api_base_url)?;

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }

        if self.search_debounce > MAX_UI_DELAY {
            return Err(Error::Config(format!(
                "Search debounce exceeds maximum of {}ms",
                MAX_UI_DELAY.as_millis()
            )));
        }

        if self.settle_delay > MAX_UI_DELAY {
            return Err(Error::Config(format!(
                "Settle delay exceeds maximum of {}ms",
                MAX_UI_DELAY.as_millis()
            )));
        }

        if self.crawl_poll_interval < MIN_POLL_INTERVAL {
            return Err(Error::Config(
                "Crawl poll interval must be at least 1 second".to_string(),
            ));
        }

        if self.request_timeout < MIN_REQUEST_TIMEOUT || self.request_timeout > MAX_REQUEST_TIMEOUT
        {
            return Err(Error::Config(format!(
                "Request timeout must be between {}s and {}s",
                MIN_REQUEST_TIMEOUT.as_secs(),
                MAX_REQUEST_TIMEOUT.as_secs()
            )));
        }

        Ok(())
    }

    /// Base URL of the `/api` surface.
    pub fn api_root(&self) -> String {
        format!("{}/api", self.api_base_url)
    }
}

fn validate_base_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(Error::Config("API base URL cannot be empty".to_string()));
    }

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "API base URL must start with http:// or https://, got '{}'",
            url
        )));
    }

    Ok(())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the catalog backend. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Other hosts: inject a platform HTTP bridge with .http_client()."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    request_timeout: Option<Duration>,
    page_size: Option<u32>,
    search_debounce: Option<Duration>,
    settle_delay: Option<Duration>,
    batch_item_spacing: Option<Duration>,
    crawl_poll_interval: Option<Duration>,
    zone_definition_path: Option<PathBuf>,
}

impl CoreConfigBuilder {
    /// Sets the backend root, e.g. `http://localhost:8000`.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Sets the HTTP bridge.
    ///
    /// Without one the `desktop-shims` default is used, or `build()` fails
    /// with `CapabilityMissing`.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn search_debounce(mut self, delay: Duration) -> Self {
        self.search_debounce = Some(delay);
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    pub fn batch_item_spacing(mut self, spacing: Duration) -> Self {
        self.batch_item_spacing = Some(spacing);
        self
    }

    pub fn crawl_poll_interval(mut self, interval: Duration) -> Self {
        self.crawl_poll_interval = Some(interval);
        self
    }

    /// Loads zones from this JSON file instead of the built-in definition.
    pub fn zone_definition_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.zone_definition_path = Some(path.into());
        self
    }

    /// Seeds a builder from a key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::default();

        if let Some(url) = lookup(ENV_API_BASE_URL) {
            builder = builder.api_base_url(url);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_API_TIMEOUT_MS)? {
            builder = builder.request_timeout(Duration::from_millis(ms));
        }
        if let Some(size) = parse_var::<u32>(&lookup, ENV_PAGE_SIZE)? {
            builder = builder.page_size(size);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_DEBOUNCE_MS)? {
            builder = builder.search_debounce(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_SETTLE_MS)? {
            builder = builder.settle_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_BATCH_SPACING_MS)? {
            builder = builder.batch_item_spacing(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_CRAWL_POLL_MS)? {
            builder = builder.crawl_poll_interval(Duration::from_millis(ms));
        }
        if let Some(path) = lookup(ENV_ZONES_PATH).filter(|p| !p.trim().is_empty()) {
            builder = builder.zone_definition_path(path);
        }

        Ok(builder)
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - `Error::Config` when the base URL is missing or a value is out of range
    /// - `Error::CapabilityMissing` when no HTTP bridge is available
    pub fn build(self) -> Result<CoreConfig> {
        let api_base_url = self
            .api_base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .ok_or_else(|| {
                Error::Config(
                    "API base URL is required. Use .api_base_url() to set it.".to_string(),
                )
            })?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let config = CoreConfig {
            api_base_url,
            http_client,
            request_timeout,
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            search_debounce: self.search_debounce.unwrap_or(DEFAULT_SEARCH_DEBOUNCE),
            settle_delay: self.settle_delay.unwrap_or(DEFAULT_SETTLE_DELAY),
            batch_item_spacing: self
                .batch_item_spacing
                .unwrap_or(DEFAULT_BATCH_ITEM_SPACING),
            crawl_poll_interval: self
                .crawl_poll_interval
                .unwrap_or(DEFAULT_CRAWL_POLL_INTERVAL),
            zone_definition_path: self.zone_definition_path,
        };

        config.validate()?;

        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid value for {}: '{}' ({})", key, raw, e))),
    }
}
