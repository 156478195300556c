//! Wire contract and HTTP client for the email discovery provider.

use crate::core::config::Config;
use crate::core::error::{AppError, Result};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Opaque handle for an in-flight discovery search.
///
/// Polling consumes the ticket, so a finished search cannot be polled again.
#[derive(Debug, PartialEq, Eq)]
pub struct SearchTicket(String);

impl SearchTicket {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Body of a search initiation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    #[serde(rename = "firstname")]
    pub first_name: String,
    #[serde(rename = "lastname")]
    pub last_name: String,
    #[serde(rename = "domainOrCompany")]
    pub domain_or_company: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitiateItem {
    #[serde(alias = "_id")]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationError {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ValidationError {
    /// True when the provider reports the account has no credits left.
    pub fn is_insufficient_credits(&self) -> bool {
        [self.kind.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .any(|text| {
                let normalized: String = text
                    .to_ascii_lowercase()
                    .chars()
                    .map(|c| if c == '_' || c == '-' { ' ' } else { c })
                    .collect();
                normalized.contains("insufficient credit")
            })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitiateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub item: Option<InitiateItem>,
    #[serde(rename = "validationErrors", default)]
    pub validation_errors: Vec<ValidationError>,
}

impl InitiateResponse {
    pub fn is_insufficient_credits(&self) -> bool {
        self.validation_errors
            .iter()
            .any(ValidationError::is_insufficient_credits)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEmail {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub certainty: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollResults {
    #[serde(default)]
    pub emails: Vec<RawEmail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollItem {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Option<PollResults>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub items: Vec<PollItem>,
}

/// The two calls of the discovery protocol.
///
/// `initiate` returns the provider's answer even when it reports failure, so
/// the caller can inspect validation errors. Errors are reserved for transport
/// problems.
#[async_trait]
pub trait DiscoveryTransport: Send + Sync {
    async fn initiate(&self, request: &SearchRequest) -> Result<InitiateResponse>;
    async fn poll(&self, ticket: &SearchTicket) -> Result<PollResponse>;
}

/// HTTP implementation of the discovery protocol.
pub struct HttpDiscoveryTransport {
    http_client: Client,
    search_endpoint: Url,
    read_endpoint: Url,
    api_key: String,
}

impl HttpDiscoveryTransport {
    /// Builds the transport. Fails with a configuration error when the
    /// discovery API key is missing.
    pub fn new(config: &Config) -> Result<Self> {
        let (api_key, base_url) = config.require_discovery()?;
        let base = base_url.trim_end_matches('/');
        let search_endpoint = Url::parse(&format!("{}/email-search", base))?;
        let read_endpoint = Url::parse(&format!("{}/bulk-single-searchs/read", base))?;

        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.discovery_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .build()
            .map_err(|e| {
                AppError::Initialization(format!("Failed to build discovery HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            search_endpoint,
            read_endpoint,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl DiscoveryTransport for HttpDiscoveryTransport {
    async fn initiate(&self, request: &SearchRequest) -> Result<InitiateResponse> {
        let response = self
            .http_client
            .post(self.search_endpoint.clone())
            .header("Authorization", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::DiscoveryProvider(format!("Search request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::DiscoveryProvider(format!("Failed to read search response: {}", e))
        })?;

        match serde_json::from_str::<InitiateResponse>(&body) {
            Ok(mut parsed) => {
                if !status.is_success() {
                    parsed.success = false;
                }
                Ok(parsed)
            }
            Err(_) if !status.is_success() => {
                tracing::debug!(target: "discovery", "Search returned HTTP {} with unparseable body", status);
                Ok(InitiateResponse::default())
            }
            Err(e) => Err(AppError::DiscoveryProvider(format!(
                "Malformed search response: {}",
                e
            ))),
        }
    }

    async fn poll(&self, ticket: &SearchTicket) -> Result<PollResponse> {
        let response = self
            .http_client
            .post(self.read_endpoint.clone())
            .header("Authorization", &self.api_key)
            .json(&serde_json::json!({ "id": ticket.as_str() }))
            .send()
            .await
            .map_err(|e| AppError::DiscoveryProvider(format!("Poll request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::DiscoveryProvider(format!(
                "Poll returned HTTP {}",
                status
            )));
        }
        response
            .json::<PollResponse>()
            .await
            .map_err(|e| AppError::DiscoveryProvider(format!("Malformed poll response: {}", e)))
    }
}
