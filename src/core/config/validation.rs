//! Contains validation logic for the final Config struct.

use super::{Config, Result};
use crate::core::error::AppError;
use url::Url;

/// Validates the configuration settings after loading and potential overrides.
/// Mutates the config to clamp values where a safe fallback exists.
///
/// Missing credentials are not an error here: each provider client checks for
/// its own credentials when it is constructed.
pub(crate) fn validate_config(config: &mut Config) -> Result<()> {
    if let Some(ref base) = config.verifier_base_url {
        Url::parse(base).map_err(|e| {
            AppError::Config(format!("Invalid verifier base URL '{}': {}", base, e))
        })?;
    }
    Url::parse(&config.discovery_base_url).map_err(|e| {
        AppError::Config(format!(
            "Invalid discovery base URL '{}': {}",
            config.discovery_base_url, e
        ))
    })?;

    if config.poll_delays.is_empty() {
        return Err(AppError::Config(
            "Poll delay schedule cannot be empty.".to_string(),
        ));
    }
    if config.max_poll_attempts == 0 {
        tracing::warn!("Max poll attempts was set to 0. Setting to 1.");
        config.max_poll_attempts = 1;
    }
    if config.cache_max_entries == 0 {
        tracing::warn!("Cache max entries was set to 0. Setting to 1.");
        config.cache_max_entries = 1;
    }
    if config.cache_ttl.is_zero() {
        tracing::warn!("Cache TTL is 0s. Every lookup will miss.");
    }
    if config.verifier_timeout.is_zero() || config.discovery_timeout.is_zero() {
        return Err(AppError::Config(
            "Provider timeouts must be greater than zero.".to_string(),
        ));
    }
    if config.max_concurrency == 0 {
        tracing::warn!("Max concurrency was set to 0. Setting to 1.");
        config.max_concurrency = 1;
    }
    Ok(())
}
