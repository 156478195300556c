//! Decides whether a verifier answer stands or needs discovery, and merges
//! the two into one result.

use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::{
    CandidateEmail, PersonName, ResolutionPath, ResolutionResult, VerificationRecord,
    VerificationStatus,
};
use crate::discovery::DiscoveryClient;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Builds a discovery client on demand. Construction may fail, e.g. when the
/// discovery provider has no credentials configured.
pub type DiscoveryFactory = Arc<dyn Fn() -> Result<DiscoveryClient> + Send + Sync>;

impl ResolutionResult {
    /// The verifier's answer, accepted as-is.
    pub fn direct(record: &VerificationRecord) -> Self {
        Self {
            email: record.address.clone(),
            status: record.mapped_status,
            certainty: None,
            path: ResolutionPath::Direct,
        }
    }

    fn discovered(candidate: CandidateEmail) -> Self {
        Self {
            email: candidate.address,
            status: VerificationStatus::Valid,
            certainty: Some(candidate.certainty),
            path: ResolutionPath::Escalated,
        }
    }

    fn catchall_fallback(record: &VerificationRecord) -> Self {
        Self {
            email: record.address.clone(),
            status: VerificationStatus::Catchall,
            certainty: None,
            path: ResolutionPath::Escalated,
        }
    }
}

/// Escalates catchall verdicts to discovery.
///
/// Discovery is optional: any failure on that side degrades to the original
/// catchall verdict and is only logged.
pub struct ResolutionOrchestrator {
    discovery_factory: DiscoveryFactory,
    credits_exhausted: AtomicBool,
}

impl ResolutionOrchestrator {
    /// Creates an orchestrator for the configured HTTP discovery provider.
    ///
    /// The client (and its connection pool) is built once here and shared by
    /// every escalation. If it cannot be built, e.g. the API key is missing,
    /// each escalation sees the same configuration error and falls back.
    pub fn new(config: &Config) -> Self {
        let built = DiscoveryClient::new(config).map_err(|e| e.to_string());
        if let Err(reason) = &built {
            tracing::debug!(target: "resolution", "Discovery client not available: {}", reason);
        }
        Self::with_discovery_factory(Arc::new(move || match &built {
            Ok(client) => Ok(client.clone()),
            Err(reason) => Err(AppError::Config(reason.clone())),
        }))
    }

    pub fn with_discovery_factory(discovery_factory: DiscoveryFactory) -> Self {
        Self {
            discovery_factory,
            credits_exhausted: AtomicBool::new(false),
        }
    }

    /// Whether discovery has been disabled for the rest of this orchestrator's
    /// lifetime because the provider account ran out of credits.
    pub fn discovery_exhausted(&self) -> bool {
        self.credits_exhausted.load(Ordering::Relaxed)
    }

    /// Produces the final result for one identity.
    ///
    /// Non-catchall records pass through unchanged. Catchall records are sent
    /// to discovery; a candidate with any acceptable tier is promoted to
    /// `Valid`, otherwise the original catchall verdict is returned.
    pub async fn resolve(
        &self,
        name: &PersonName,
        domain: &str,
        record: &VerificationRecord,
    ) -> ResolutionResult {
        if record.mapped_status != VerificationStatus::Catchall {
            tracing::debug!(target: "resolution", "[{}] Accepting verifier status {}",
                record.address, record.mapped_status);
            return ResolutionResult::direct(record);
        }

        let task_label = format!("[{} {} @ {}]", name.first, name.last, domain);
        tracing::info!(target: "resolution", "{} {} is on a catchall domain, escalating to discovery",
            task_label, record.address);

        match self.discover(name, domain, &task_label).await {
            Some(candidate) => {
                tracing::info!(target: "resolution", "{} Resolved to {} ({})",
                    task_label, candidate.address, candidate.certainty);
                ResolutionResult::discovered(candidate)
            }
            None => {
                tracing::info!(target: "resolution", "{} No discovery answer, keeping catchall verdict for {}",
                    task_label, record.address);
                ResolutionResult::catchall_fallback(record)
            }
        }
    }

    async fn discover(
        &self,
        name: &PersonName,
        domain: &str,
        task_label: &str,
    ) -> Option<CandidateEmail> {
        if self.discovery_exhausted() {
            tracing::debug!(target: "resolution", "{} Discovery disabled after credit exhaustion", task_label);
            return None;
        }

        let client = match (self.discovery_factory)() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(target: "resolution", "{} Discovery unavailable: {}", task_label, e);
                return None;
            }
        };

        match client.search(&name.first, &name.last, domain).await {
            Ok(candidate) => candidate,
            Err(e @ AppError::InsufficientCredits(_)) => {
                self.credits_exhausted.store(true, Ordering::Relaxed);
                tracing::error!(target: "resolution",
                    "{} {}. Skipping discovery for the rest of this run.", task_label, e);
                None
            }
            Err(e) => {
                tracing::warn!(target: "resolution", "{} Discovery failed: {}", task_label, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::CertaintyTier;
    use crate::discovery::{
        DiscoveryTransport, InitiateItem, InitiateResponse, PollItem, PollResponse, PollResults,
        PollSchedule, RawEmail, SearchRequest, SearchTicket, ValidationError,
    };
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Finds `address` at `certainty` on the first poll, or declines the search.
    struct FakeDiscovery {
        answer: Option<(&'static str, &'static str)>,
        out_of_credits: bool,
        initiated: AtomicUsize,
    }

    #[async_trait]
    impl DiscoveryTransport for FakeDiscovery {
        async fn initiate(&self, _request: &SearchRequest) -> Result<InitiateResponse> {
            self.initiated.fetch_add(1, Ordering::SeqCst);
            if self.out_of_credits {
                return Ok(InitiateResponse {
                    success: false,
                    item: None,
                    validation_errors: vec![ValidationError {
                        kind: Some("insufficient credits".into()),
                        message: None,
                    }],
                });
            }
            Ok(InitiateResponse {
                success: true,
                item: Some(InitiateItem { id: "t".into() }),
                validation_errors: Vec::new(),
            })
        }

        async fn poll(&self, _ticket: &SearchTicket) -> Result<PollResponse> {
            let emails = self
                .answer
                .map(|(email, certainty)| {
                    vec![RawEmail {
                        email: email.into(),
                        certainty: Some(certainty.into()),
                    }]
                })
                .unwrap_or_default();
            Ok(PollResponse {
                success: true,
                items: vec![PollItem {
                    status: "FOUND".into(),
                    results: Some(PollResults { emails }),
                }],
            })
        }
    }

    fn orchestrator_with(fake: Arc<FakeDiscovery>) -> ResolutionOrchestrator {
        ResolutionOrchestrator::with_discovery_factory(Arc::new(move || {
            Ok(DiscoveryClient::with_transport(
                fake.clone(),
                PollSchedule::new(vec![Duration::ZERO], 5),
            ))
        }))
    }

    fn fake(answer: Option<(&'static str, &'static str)>) -> Arc<FakeDiscovery> {
        Arc::new(FakeDiscovery {
            answer,
            out_of_credits: false,
            initiated: AtomicUsize::new(0),
        })
    }

    fn record(address: &str, status: VerificationStatus) -> VerificationRecord {
        VerificationRecord {
            address: address.to_string(),
            state: "risky".to_string(),
            sub_state: "accept_all".to_string(),
            mapped_status: status,
            extra: serde_json::Map::new(),
        }
    }

    fn name() -> PersonName {
        PersonName::new("Ada", "Lovelace")
    }

    #[tokio::test]
    async fn test_escalation_promotes_candidate() {
        let orchestrator = orchestrator_with(fake(Some(("icypeas@example.com", "ultra_sure"))));
        let result = orchestrator
            .resolve(
                &name(),
                "example.com",
                &record("catchall@example.com", VerificationStatus::Catchall),
            )
            .await;
        assert_eq!(
            result,
            ResolutionResult {
                email: "icypeas@example.com".into(),
                status: VerificationStatus::Valid,
                certainty: Some(CertaintyTier::UltraSure),
                path: ResolutionPath::Escalated,
            }
        );
    }

    #[tokio::test]
    async fn test_lowest_tier_still_promotes() {
        let orchestrator = orchestrator_with(fake(Some(("p@example.com", "probable"))));
        let result = orchestrator
            .resolve(
                &name(),
                "example.com",
                &record("catchall@example.com", VerificationStatus::Catchall),
            )
            .await;
        assert_eq!(result.status, VerificationStatus::Valid);
        assert_eq!(result.certainty, Some(CertaintyTier::Probable));
    }

    #[tokio::test]
    async fn test_factory_failure_falls_back_to_catchall() {
        let orchestrator = ResolutionOrchestrator::with_discovery_factory(Arc::new(|| {
            Err(AppError::Config("Discovery API key is not configured.".into()))
        }));
        let result = orchestrator
            .resolve(
                &name(),
                "example.com",
                &record("catchall@example.com", VerificationStatus::Catchall),
            )
            .await;
        assert_eq!(result.email, "catchall@example.com");
        assert_eq!(result.status, VerificationStatus::Catchall);
        assert_eq!(result.certainty, None);
    }

    #[tokio::test]
    async fn test_no_candidate_falls_back_to_catchall() {
        let orchestrator = orchestrator_with(fake(None));
        let result = orchestrator
            .resolve(
                &name(),
                "example.com",
                &record("catchall@example.com", VerificationStatus::Catchall),
            )
            .await;
        assert_eq!(result.status, VerificationStatus::Catchall);
        assert_eq!(result.email, "catchall@example.com");
    }

    #[tokio::test]
    async fn test_non_catchall_passes_through_without_discovery() {
        let discovery = fake(Some(("other@example.com", "ultra_sure")));
        let orchestrator = orchestrator_with(discovery.clone());
        for status in [
            VerificationStatus::Valid,
            VerificationStatus::Invalid,
            VerificationStatus::Unknown,
        ] {
            let input = record("ada@example.com", status);
            let result = orchestrator.resolve(&name(), "example.com", &input).await;
            assert_eq!(result, ResolutionResult::direct(&input));
            assert_eq!(result.status, status);
        }
        assert_eq!(discovery.initiated.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_credit_exhaustion_disables_later_discovery() {
        let discovery = Arc::new(FakeDiscovery {
            answer: None,
            out_of_credits: true,
            initiated: AtomicUsize::new(0),
        });
        let orchestrator = orchestrator_with(discovery.clone());
        let input = record("catchall@example.com", VerificationStatus::Catchall);

        let first = orchestrator.resolve(&name(), "example.com", &input).await;
        let second = orchestrator.resolve(&name(), "example.com", &input).await;
        assert_eq!(first.status, VerificationStatus::Catchall);
        assert_eq!(second.status, VerificationStatus::Catchall);
        assert!(orchestrator.discovery_exhausted());
        assert_eq!(discovery.initiated.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_default_orchestrator_without_key_falls_back() {
        // A missing discovery key only shows up on escalation.
        let orchestrator = ResolutionOrchestrator::new(&Config::default());
        assert!(!orchestrator.discovery_exhausted());
        assert!(matches!(
            (orchestrator.discovery_factory)(),
            Err(AppError::Config(_))
        ));
        let result = orchestrator
            .resolve(
                &name(),
                "example.com",
                &record("catchall@example.com", VerificationStatus::Catchall),
            )
            .await;
        assert_eq!(result.status, VerificationStatus::Catchall);
    }

    #[test]
    fn test_http_client_is_built_once_and_shared() {
        let config = Config {
            discovery_api_key: Some("dk".into()),
            ..Config::default()
        };
        let orchestrator = ResolutionOrchestrator::new(&config);
        let clients: Vec<DiscoveryClient> = (0..3)
            .map(|_| (orchestrator.discovery_factory)().unwrap())
            .collect();
        assert!(clients[0].shares_transport_with(&clients[1]));
        assert!(clients[1].shares_transport_with(&clients[2]));
    }
}
