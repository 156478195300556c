//! Provides the `ConfigBuilder` for fluent configuration construction.

use super::loading::{apply_file_config, load_config_file};
use super::validation::validate_config;
use super::{Config, ConfigFile, Result};
use crate::AppError;
use std::path::Path;
use std::time::Duration;

/// Builder pattern for creating `Config` instances fluently.
///
/// Settings are layered as defaults, then the config file, then the overrides
/// set on the builder, and the result is validated.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    config_file_path: Option<String>,
    overrides: ConfigFile,
    durations: DurationOverrides,
}

/// Duration overrides are kept as-is rather than squeezed into the file's
/// whole-second and millisecond fields.
#[derive(Default)]
struct DurationOverrides {
    verifier_timeout: Option<Duration>,
    discovery_timeout: Option<Duration>,
    cache_ttl: Option<Duration>,
    poll_delays: Option<Vec<Duration>>,
}

impl DurationOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(d) = self.verifier_timeout {
            config.verifier_timeout = d;
        }
        if let Some(d) = self.discovery_timeout {
            config.discovery_timeout = d;
        }
        if let Some(d) = self.cache_ttl {
            config.cache_ttl = d;
        }
        if let Some(delays) = self.poll_delays {
            config.poll_delays = delays;
        }
    }
}

impl ConfigBuilder {
    /// Creates a new builder with default configuration values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify an optional configuration file path to load.
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    pub fn verifier_api_key(mut self, key: impl Into<String>) -> Self {
        self.overrides.verifier.api_key = Some(key.into());
        self
    }
    pub fn verifier_base_url(mut self, url: impl Into<String>) -> Self {
        self.overrides.verifier.base_url = Some(url.into());
        self
    }
    pub fn verifier_timeout(mut self, duration: Duration) -> Self {
        self.durations.verifier_timeout = Some(duration);
        self
    }
    pub fn discovery_api_key(mut self, key: impl Into<String>) -> Self {
        self.overrides.discovery.api_key = Some(key.into());
        self
    }
    pub fn discovery_base_url(mut self, url: impl Into<String>) -> Self {
        self.overrides.discovery.base_url = Some(url.into());
        self
    }
    pub fn discovery_timeout(mut self, duration: Duration) -> Self {
        self.durations.discovery_timeout = Some(duration);
        self
    }
    pub fn poll_delays(mut self, delays: Vec<Duration>) -> Self {
        self.durations.poll_delays = Some(delays);
        self
    }
    pub fn max_poll_attempts(mut self, value: u32) -> Self {
        self.overrides.discovery.max_poll_attempts = Some(value);
        self
    }
    pub fn cache_ttl(mut self, duration: Duration) -> Self {
        self.durations.cache_ttl = Some(duration);
        self
    }
    pub fn cache_max_entries(mut self, value: usize) -> Self {
        self.overrides.cache.max_entries = Some(value);
        self
    }
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.overrides.network.user_agent = Some(value.into());
        self
    }
    pub fn pool_max_idle_per_host(mut self, value: usize) -> Self {
        self.overrides.network.pool_max_idle_per_host = Some(value);
        self
    }
    pub fn max_concurrency(mut self, value: usize) -> Self {
        self.overrides.network.max_concurrency = Some(value);
        self
    }

    /// Builds the final `Config` object, applying defaults, file settings, overrides, and validation.
    pub fn build(mut self) -> Result<Config> {
        let mut loaded_path: Option<String> = None;

        if let Some(ref path) = self.config_file_path {
            match load_config_file(path) {
                Ok(file_config) => {
                    apply_file_config(&mut self.config, &file_config);
                    loaded_path = Some(path.clone());
                    tracing::info!("Loaded base configuration from specified file: {}", path);
                }
                Err(e) => {
                    tracing::error!("Failed to load specified config file '{}': {}", path, e);
                    return Err(AppError::Config(format!(
                        "Failed to load specified configuration file '{}': {}",
                        path, e
                    )));
                }
            }
        } else {
            for path_str in ["./email-enrich.toml", "./config.toml"] {
                if Path::new(path_str).exists() {
                    tracing::debug!("Found potential default config file: {}", path_str);
                    match load_config_file(path_str) {
                        Ok(file_config) => {
                            apply_file_config(&mut self.config, &file_config);
                            loaded_path = Some(path_str.to_string());
                            tracing::info!(
                                "Loaded base configuration from default location: {}",
                                path_str
                            );
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Failed to load or parse default config '{}': {}",
                                path_str,
                                e
                            );
                        }
                    }
                }
            }
            if loaded_path.is_none() {
                tracing::debug!("No configuration file found. Using default values and overrides.");
            }
        }

        apply_file_config(&mut self.config, &self.overrides);
        self.durations.apply(&mut self.config);
        self.config.loaded_config_path = loaded_path;
        validate_config(&mut self.config)?;

        tracing::debug!("Final configuration built successfully.");
        Ok(self.config)
    }
}
