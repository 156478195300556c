//! The public surface: one verifier and one orchestrator owned together.

use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::models::{PersonName, ResolutionResult, VerificationRecord};
use crate::core::resolution::ResolutionOrchestrator;
use crate::utils::normalize_address;
use crate::verification::BatchVerifier;

use std::collections::HashMap;

/// What [`EnrichmentPipeline::resolve`] consumes: the verifier's record for an address.
pub type ResolutionInput = VerificationRecord;

/// Owns the verification cache and both provider clients for one run.
///
/// Nothing is global; two pipelines never share a cache.
pub struct EnrichmentPipeline {
    verifier: BatchVerifier,
    orchestrator: ResolutionOrchestrator,
}

impl EnrichmentPipeline {
    /// Builds a pipeline for the configured providers.
    ///
    /// The verifier is required and must be fully configured. Discovery
    /// credentials are only checked when a catchall record needs them.
    pub fn new(config: &Config) -> Result<Self> {
        let verifier = BatchVerifier::new(config)?;
        let orchestrator = ResolutionOrchestrator::new(config);
        tracing::debug!(target: "pipeline", "Pipeline initialized (cache capacity {}, TTL {:?})",
            config.cache_max_entries, config.cache_ttl);
        Ok(Self::from_parts(verifier, orchestrator))
    }

    pub fn from_parts(verifier: BatchVerifier, orchestrator: ResolutionOrchestrator) -> Self {
        Self {
            verifier,
            orchestrator,
        }
    }

    pub fn verifier(&self) -> &BatchVerifier {
        &self.verifier
    }

    pub fn orchestrator(&self) -> &ResolutionOrchestrator {
        &self.orchestrator
    }

    /// Verifies addresses in bulk. Keys of the returned map are normalized
    /// (trimmed, lower-cased) addresses.
    ///
    /// # Errors
    /// Verification provider failures and missing configuration are returned
    /// to the caller.
    pub async fn verify_bulk<I, S>(&self, addresses: I) -> Result<HashMap<String, ResolutionInput>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.verifier.verify(addresses).await
    }

    /// Resolves one identity from its verifier record. Never fails; discovery
    /// problems degrade to the verifier's own answer.
    pub async fn resolve(
        &self,
        name: &PersonName,
        domain: &str,
        record: &ResolutionInput,
    ) -> ResolutionResult {
        self.orchestrator.resolve(name, domain, record).await
    }

    /// Verifies a single address and resolves it.
    ///
    /// Returns `Ok(None)` when the address is blank or the provider returned
    /// no record for it.
    pub async fn enrich(
        &self,
        name: &PersonName,
        domain: &str,
        address: &str,
    ) -> Result<Option<(VerificationRecord, ResolutionResult)>> {
        let Some(key) = normalize_address(address) else {
            return Ok(None);
        };
        let mut records = self.verify_bulk([key.as_str()]).await?;
        let Some(record) = records.remove(&key) else {
            tracing::warn!(target: "pipeline", "[{}] Verifier returned no record", key);
            return Ok(None);
        };
        let resolution = self.resolve(name, domain, &record).await;
        Ok(Some((record, resolution)))
    }
}
