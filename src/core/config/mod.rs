//! Defines the core runtime `Config` struct, its defaults, and related utilities.
//! Submodules handle loading, building, and validation.

pub(crate) mod builder;
pub(crate) mod file;
pub(crate) mod loading;
pub(crate) mod validation;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::core::error::Result;
use std::time::Duration;

/// Default discovery provider endpoint.
pub const DEFAULT_DISCOVERY_BASE_URL: &str = "https://app.icypeas.com/api";

/// Inter-poll delays (milliseconds) used when waiting for a discovery search to complete.
pub const DEFAULT_POLL_DELAYS_MS: [u64; 5] = [300, 500, 800, 1000, 1500];

/// Runtime configuration settings used by the email-enrich core logic.
#[derive(Clone)]
pub struct Config {
    pub verifier_api_key: Option<String>,
    pub verifier_base_url: Option<String>,
    pub verifier_timeout: Duration,

    pub discovery_api_key: Option<String>,
    pub discovery_base_url: String,
    pub discovery_timeout: Duration,
    pub poll_delays: Vec<Duration>,
    pub max_poll_attempts: u32,

    pub cache_ttl: Duration,
    pub cache_max_entries: usize,

    pub user_agent: String,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub max_concurrency: usize,

    pub loaded_config_path: Option<String>,
}

impl Config {
    fn build_default() -> Self {
        Config {
            verifier_api_key: None,
            verifier_base_url: None,
            verifier_timeout: Duration::from_secs(10),
            discovery_api_key: None,
            discovery_base_url: DEFAULT_DISCOVERY_BASE_URL.to_string(),
            discovery_timeout: Duration::from_secs(30),
            poll_delays: DEFAULT_POLL_DELAYS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            max_poll_attempts: 5,
            cache_ttl: Duration::from_secs(3600),
            cache_max_entries: 10_000,
            user_agent: format!("email-enrich-core/{}", env!("CARGO_PKG_VERSION")),
            pool_max_idle_per_host: 10,
            pool_idle_timeout: Duration::from_secs(90),
            max_concurrency: std::thread::available_parallelism()
                .map_or(1, |n| n.get())
                .max(1),
            loaded_config_path: None,
        }
    }

    /// Returns the verifier credentials, or a configuration error naming what is missing.
    pub(crate) fn require_verifier(&self) -> Result<(&str, &str)> {
        let key = self.verifier_api_key.as_deref().ok_or_else(|| {
            crate::AppError::Config("Verifier API key is not configured.".to_string())
        })?;
        let base = self.verifier_base_url.as_deref().ok_or_else(|| {
            crate::AppError::Config("Verifier base URL is not configured.".to_string())
        })?;
        Ok((key, base))
    }

    /// Returns the discovery credentials, or a configuration error naming what is missing.
    pub(crate) fn require_discovery(&self) -> Result<(&str, &str)> {
        let key = self.discovery_api_key.as_deref().ok_or_else(|| {
            crate::AppError::Config("Discovery API key is not configured.".to_string())
        })?;
        Ok((key, self.discovery_base_url.as_str()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::build_default()
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    if secret.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("verifier_api_key", &redact(&self.verifier_api_key))
            .field("verifier_base_url", &self.verifier_base_url)
            .field("verifier_timeout", &self.verifier_timeout)
            .field("discovery_api_key", &redact(&self.discovery_api_key))
            .field("discovery_base_url", &self.discovery_base_url)
            .field("discovery_timeout", &self.discovery_timeout)
            .field("poll_delays", &self.poll_delays)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_max_entries", &self.cache_max_entries)
            .field("user_agent", &self.user_agent)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("max_concurrency", &self.max_concurrency)
            .field("loaded_config_path", &self.loaded_config_path)
            .finish()
    }
}
