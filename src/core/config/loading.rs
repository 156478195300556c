//! Handles loading configuration from files and applying it to the Config struct.

use super::{Config, ConfigFile};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Loads configuration settings from a TOML file.
/// Returns the parsed `ConfigFile` content.
pub(crate) fn load_config_file(file_path: &str) -> anyhow::Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!(
            "File not found or is not a file: {}",
            file_path
        ));
    }
    tracing::debug!("Attempting to read config file: {}", file_path);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", file_path))?;

    let config_file_content: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", file_path))?;

    tracing::debug!("Successfully parsed configuration file: {}", file_path);
    Ok(config_file_content)
}

fn non_blank(value: &Option<String>) -> Option<Option<String>> {
    value.as_ref().map(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Applies settings from a parsed `ConfigFile` onto a mutable `Config` instance.
/// Later calls win, so the builder applies the file first and overrides second.
pub(crate) fn apply_file_config(config: &mut Config, file_config: &ConfigFile) {
    // Verifier
    if let Some(key) = non_blank(&file_config.verifier.api_key) {
        config.verifier_api_key = key;
    }
    if let Some(url) = non_blank(&file_config.verifier.base_url) {
        config.verifier_base_url = url;
    }
    if let Some(timeout) = file_config.verifier.timeout {
        config.verifier_timeout = Duration::from_secs(timeout);
    }

    // Discovery
    if let Some(key) = non_blank(&file_config.discovery.api_key) {
        config.discovery_api_key = key;
    }
    if let Some(Some(url)) = non_blank(&file_config.discovery.base_url) {
        config.discovery_base_url = url;
    }
    if let Some(timeout) = file_config.discovery.timeout {
        config.discovery_timeout = Duration::from_secs(timeout);
    }
    if let Some(ref delays) = file_config.discovery.poll_delays_ms {
        config.poll_delays = delays.iter().map(|ms| Duration::from_millis(*ms)).collect();
    }
    if let Some(attempts) = file_config.discovery.max_poll_attempts {
        config.max_poll_attempts = attempts;
    }

    // Cache
    if let Some(ttl) = file_config.cache.ttl {
        config.cache_ttl = Duration::from_secs(ttl);
    }
    if let Some(max_entries) = file_config.cache.max_entries {
        config.cache_max_entries = max_entries;
    }

    // Network
    if let Some(ref user_agent) = file_config.network.user_agent {
        config.user_agent = user_agent.clone();
    }
    if let Some(idle) = file_config.network.pool_max_idle_per_host {
        config.pool_max_idle_per_host = idle;
    }
    if let Some(idle_timeout) = file_config.network.pool_idle_timeout {
        config.pool_idle_timeout = Duration::from_secs(idle_timeout);
    }
    if let Some(concurrency) = file_config.network.max_concurrency {
        config.max_concurrency = concurrency;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_api_key_clears_value() {
        let mut config = Config {
            verifier_api_key: Some("old".into()),
            ..Config::default()
        };
        let mut file = ConfigFile::default();
        file.verifier.api_key = Some("   ".into());
        apply_file_config(&mut config, &file);
        assert!(config.verifier_api_key.is_none());
    }

    #[test]
    fn test_apply_overrides_only_present_fields() {
        let mut config = Config::default();
        let mut file = ConfigFile::default();
        file.cache.ttl = Some(120);
        file.discovery.poll_delays_ms = Some(vec![100, 200]);
        apply_file_config(&mut config, &file);
        assert_eq!(config.cache_ttl, Duration::from_secs(120));
        assert_eq!(
            config.poll_delays,
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.max_poll_attempts, 5);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_config_file("./definitely-not-here.toml").is_err());
    }
}
