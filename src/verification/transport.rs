//! Wire contract and HTTP client for the bulk verification provider.

use crate::core::config::Config;
use crate::core::error::{AppError, Result};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

/// One record as returned by the verification provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRecord {
    pub address: String,
    pub state: Option<String>,
    pub sub_state: Option<String>,
    /// Every other field of the provider record, verbatim.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn take_string(
    fields: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Option<String> {
    match fields.remove(key)? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    }
}

impl ProviderRecord {
    /// Reads one raw record. The address may be given as `address` or
    /// `email` (or both, in which case the first non-blank one wins).
    ///
    /// Returns `None` for records that are not objects or carry no address.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        let serde_json::Value::Object(mut fields) = value else {
            tracing::warn!(target: "verification_bulk", "Skipping non-object provider record");
            return None;
        };
        let address = take_string(&mut fields, "address");
        let email = take_string(&mut fields, "email");
        let Some(address) = [address, email]
            .into_iter()
            .flatten()
            .find(|a| !a.trim().is_empty())
        else {
            tracing::warn!(target: "verification_bulk", "Skipping provider record without an address");
            return None;
        };
        let state = take_string(&mut fields, "state");
        let sub_state = take_string(&mut fields, "sub_state");
        Some(Self {
            address,
            state,
            sub_state,
            extra: fields,
        })
    }
}

/// Batch envelope. Records stay untyped here so one odd record cannot fail
/// the whole batch.
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchResponse {
    List(Vec<serde_json::Value>),
    Wrapped { results: Vec<serde_json::Value> },
}

impl BatchResponse {
    fn into_records(self) -> Vec<ProviderRecord> {
        let values = match self {
            BatchResponse::List(records) => records,
            BatchResponse::Wrapped { results } => results,
        };
        values
            .into_iter()
            .filter_map(ProviderRecord::from_value)
            .collect()
    }
}

/// Sends one batch of addresses to a verification provider.
///
/// Implementations return one record per address the provider answered for;
/// partial answers are allowed. Any transport failure or non-2xx response
/// must be reported as an error for the whole batch.
#[async_trait]
pub trait VerificationTransport: Send + Sync {
    async fn verify_batch(&self, addresses: &[String]) -> Result<Vec<ProviderRecord>>;
}

/// HTTP implementation backed by a single pooled `reqwest::Client`.
pub struct HttpVerificationTransport {
    http_client: Client,
    endpoint: Url,
    api_key: String,
}

impl HttpVerificationTransport {
    /// Builds the transport. Fails with a configuration error when the
    /// verifier API key or base URL is missing.
    pub fn new(config: &Config) -> Result<Self> {
        let (api_key, base_url) = config.require_verifier()?;
        let endpoint = Url::parse(&format!("{}/verify/batch", base_url.trim_end_matches('/')))?;

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.verifier_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .build()
            .map_err(|e| {
                AppError::Initialization(format!("Failed to build verifier HTTP client: {}", e))
            })?;

        tracing::debug!(target: "verification_bulk", "Verifier HTTP client initialized for {}", endpoint);
        Ok(Self {
            http_client,
            endpoint,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl VerificationTransport for HttpVerificationTransport {
    async fn verify_batch(&self, addresses: &[String]) -> Result<Vec<ProviderRecord>> {
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header("x-api-key", &self.api_key)
            .json(&serde_json::json!({ "emails": addresses }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::VerificationProvider(format!("Request timed out: {}", e))
                } else {
                    AppError::VerificationProvider(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(AppError::VerificationProvider(format!(
                "HTTP {}: {}",
                status, snippet
            )));
        }

        let parsed: BatchResponse = response.json().await.map_err(|e| {
            AppError::VerificationProvider(format!("Malformed batch response: {}", e))
        })?;
        Ok(parsed.into_records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_list_and_email_alias() {
        let raw = r#"[
            {"email": "a@x.com", "state": "ok", "sub_state": null, "score": 97},
            {"address": "b@x.com", "state": "risky"}
        ]"#;
        let records = serde_json::from_str::<BatchResponse>(raw)
            .unwrap()
            .into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address, "a@x.com");
        assert_eq!(records[0].sub_state, None);
        assert_eq!(records[0].extra.get("score"), Some(&serde_json::json!(97)));
        assert_eq!(records[1].state.as_deref(), Some("risky"));
    }

    #[test]
    fn test_mixed_shapes_do_not_fail_the_batch() {
        let raw = r#"[
            {"email": "a@x.com", "address": "a@x.com", "state": "ok"},
            {"address": "", "email": "b@x.com", "state": "risky", "sub_state": "accept_all"},
            {"state": "ok"},
            "garbage",
            {"address": "c@x.com", "state": 3}
        ]"#;
        let records = serde_json::from_str::<BatchResponse>(raw)
            .unwrap()
            .into_records();
        let addresses: Vec<&str> = records.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["a@x.com", "b@x.com", "c@x.com"]);
        assert!(records[0].extra.is_empty());
        assert_eq!(records[1].sub_state.as_deref(), Some("accept_all"));
        assert_eq!(records[2].state, None);
    }

    #[test]
    fn test_parse_wrapped_results() {
        let raw = r#"{"results": [{"address": "a@x.com", "state": "invalid", "sub_state": "no_mailbox"}]}"#;
        let records = serde_json::from_str::<BatchResponse>(raw)
            .unwrap()
            .into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sub_state.as_deref(), Some("no_mailbox"));
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let config = Config::default();
        assert!(matches!(
            HttpVerificationTransport::new(&config),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = Config {
            verifier_api_key: Some("k".into()),
            verifier_base_url: Some("https://verify.test/v2/".into()),
            ..Config::default()
        };
        let transport = HttpVerificationTransport::new(&config).unwrap();
        assert_eq!(
            transport.endpoint.as_str(),
            "https://verify.test/v2/verify/batch"
        );
    }
}
