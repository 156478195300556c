//! Defines the structure mirroring the TOML configuration file format.

use serde::Deserialize;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub(crate) verifier: VerifierConfig,
    #[serde(default)]
    pub(crate) discovery: DiscoveryConfig,
    #[serde(default)]
    pub(crate) cache: CacheConfig,
    #[serde(default)]
    pub(crate) network: NetworkConfig,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct VerifierConfig {
    pub(crate) api_key: Option<String>,
    pub(crate) base_url: Option<String>,
    pub(crate) timeout: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct DiscoveryConfig {
    pub(crate) api_key: Option<String>,
    pub(crate) base_url: Option<String>,
    pub(crate) timeout: Option<u64>,
    /// Milliseconds to wait before each poll attempt.
    pub(crate) poll_delays_ms: Option<Vec<u64>>,
    pub(crate) max_poll_attempts: Option<u32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct CacheConfig {
    pub(crate) ttl: Option<u64>,
    pub(crate) max_entries: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct NetworkConfig {
    pub(crate) user_agent: Option<String>,
    pub(crate) pool_max_idle_per_host: Option<usize>,
    pub(crate) pool_idle_timeout: Option<u64>,
    pub(crate) max_concurrency: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let raw = r#"
            [verifier]
            api_key = "vk"
            base_url = "https://verify.test/v1"
            timeout = 8

            [discovery]
            api_key = "dk"
            poll_delays_ms = [200, 400]
            max_poll_attempts = 3

            [cache]
            ttl = 600
            max_entries = 500

            [network]
            pool_max_idle_per_host = 4
        "#;
        let parsed: ConfigFile = toml::from_str(raw).unwrap();
        assert_eq!(parsed.verifier.api_key.as_deref(), Some("vk"));
        assert_eq!(parsed.verifier.timeout, Some(8));
        assert_eq!(parsed.discovery.poll_delays_ms, Some(vec![200, 400]));
        assert_eq!(parsed.cache.max_entries, Some(500));
        assert_eq!(parsed.network.pool_max_idle_per_host, Some(4));
        assert!(parsed.network.user_agent.is_none());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let raw = r#"
            [cache]
            ttl = 60
            flush_on_exit = true
        "#;
        assert!(toml::from_str::<ConfigFile>(raw).is_err());
    }
}
