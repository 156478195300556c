//! # Email Enrich Core Library
//!
//! Verifies email addresses in bulk against a verification provider and, when
//! the provider can only say the domain accepts everything (a catchall),
//! escalates to a search-based discovery provider for a confident answer.
//!
//! It is designed to be used either directly as a library or via the
//! `email-enrich` command-line tool (which uses this library).

mod core;
mod utils;

pub mod discovery;
pub mod verification;

pub use crate::core::config::{Config, ConfigBuilder, ConfigFile};
pub use crate::core::error::{AppError, Result};
pub use crate::core::models::{
    CandidateEmail, CertaintyTier, Contact, EnrichedContact, PersonName, ResolutionPath,
    ResolutionResult, VerificationRecord, VerificationStatus,
};
pub use crate::core::pipeline::{EnrichmentPipeline, ResolutionInput};
pub use crate::core::resolution::{DiscoveryFactory, ResolutionOrchestrator};

use crate::utils::{domain_of, normalize_address};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;

/// Initializes a pipeline (verifier, cache and discovery factory) from configuration.
pub fn initialize_pipeline(config: &Config) -> Result<EnrichmentPipeline> {
    EnrichmentPipeline::new(config)
}

/// Verifies and resolves a list of contacts.
///
/// All addresses are verified in one bulk call first, then each contact is
/// resolved concurrently (at most `max_concurrency` at a time). The output
/// has one entry per input contact, in input order.
///
/// # Errors
/// Bulk verification failures abort the whole run. Discovery problems never
/// do; they only leave the affected contact on its catchall verdict.
pub async fn process_contacts(
    pipeline: Arc<EnrichmentPipeline>,
    contacts: Vec<Contact>,
    max_concurrency: usize,
) -> Result<Vec<EnrichedContact>> {
    if contacts.is_empty() {
        return Ok(Vec::new());
    }

    let addresses: Vec<&str> = contacts
        .iter()
        .filter_map(|c| c.email.as_deref())
        .collect();
    tracing::info!(target: "pipeline", "Verifying {} addresses for {} contacts",
        addresses.len(), contacts.len());
    let records = pipeline.verify_bulk(addresses).await?;

    let max_concurrency = max_concurrency.max(1);
    let mut results: Vec<EnrichedContact> = Vec::with_capacity(contacts.len());
    let mut tasks = FuturesUnordered::new();

    for (index, contact) in contacts.into_iter().enumerate() {
        let Some(key) = contact.email.as_deref().and_then(normalize_address) else {
            results.push(EnrichedContact::skipped(contact, "Missing email".to_string()));
            continue;
        };
        let Some(record) = records.get(&key).cloned() else {
            tracing::warn!(target: "pipeline", "[{}] No verification record returned", key);
            results.push(EnrichedContact::error(
                contact,
                "Verifier returned no record for this address".to_string(),
            ));
            continue;
        };

        let domain = contact
            .domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_lowercase)
            .or_else(|| domain_of(&key));
        let name = contact.person_name();

        let (Some(name), Some(domain)) = (name, domain) else {
            let mut enriched = EnrichedContact::verified(contact, record);
            if enriched.resolution.as_ref().map(|r| r.status) == Some(VerificationStatus::Catchall)
            {
                enriched.enrichment_reason =
                    Some("Missing name or domain, discovery not attempted".to_string());
            }
            results.push(enriched);
            continue;
        };

        while tasks.len() >= max_concurrency {
            if let Some((slot, joined)) = tasks.next().await {
                collect_task(&mut results, slot, joined);
            }
        }

        results.push(EnrichedContact::pending(contact, record.clone()));
        let slot = results.len() - 1;
        let pipeline = Arc::clone(&pipeline);
        let handle = tokio::spawn(async move { pipeline.resolve(&name, &domain, &record).await });
        tasks.push(async move { (slot, handle.await) });
        tracing::trace!(target: "pipeline", "Queued contact #{} for resolution", index);
    }

    while let Some((slot, joined)) = tasks.next().await {
        collect_task(&mut results, slot, joined);
    }

    Ok(results)
}

fn collect_task(
    results: &mut [EnrichedContact],
    slot: usize,
    joined: std::result::Result<ResolutionResult, tokio::task::JoinError>,
) {
    match joined {
        Ok(resolution) => results[slot].resolution = Some(resolution),
        Err(e) => {
            tracing::error!(target: "pipeline", "A resolution task failed to join: {}", e);
            results[slot].enrichment_error = Some(format!("Resolution task failed: {}", e));
        }
    }
}

impl EnrichedContact {
    fn skipped(contact: Contact, reason: String) -> Self {
        Self {
            contact_input: contact,
            verification: None,
            resolution: None,
            enrichment_skipped: true,
            enrichment_reason: Some(reason),
            enrichment_error: None,
        }
    }

    fn error(contact: Contact, error_msg: String) -> Self {
        Self {
            contact_input: contact,
            verification: None,
            resolution: None,
            enrichment_skipped: false,
            enrichment_reason: None,
            enrichment_error: Some(error_msg),
        }
    }

    fn pending(contact: Contact, record: VerificationRecord) -> Self {
        Self {
            contact_input: contact,
            verification: Some(record),
            resolution: None,
            enrichment_skipped: false,
            enrichment_reason: None,
            enrichment_error: None,
        }
    }

    fn verified(contact: Contact, record: VerificationRecord) -> Self {
        let resolution = ResolutionResult::direct(&record);
        Self {
            resolution: Some(resolution),
            ..Self::pending(contact, record)
        }
    }

    /// The final address for this contact, if one was resolved.
    pub fn final_email(&self) -> Option<&str> {
        self.resolution.as_ref().map(|r| r.email.as_str())
    }
}

/// Counts of final statuses across a run, keyed by status.
pub fn status_counts(results: &[EnrichedContact]) -> HashMap<VerificationStatus, usize> {
    let mut counts = HashMap::new();
    for status in results
        .iter()
        .filter_map(|r| r.resolution.as_ref().map(|res| res.status))
    {
        *counts.entry(status).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::{
        BatchVerifier, ProviderRecord, VerificationCache, VerificationTransport,
    };
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answers `ok` for every address, except `*@catchall.test` which is catchall.
    struct DomainVerifier;

    #[async_trait]
    impl VerificationTransport for DomainVerifier {
        async fn verify_batch(&self, addresses: &[String]) -> Result<Vec<ProviderRecord>> {
            Ok(addresses
                .iter()
                .map(|address| {
                    let (state, sub_state) = if address.ends_with("@catchall.test") {
                        ("risky", "accept_all")
                    } else {
                        ("ok", "")
                    };
                    ProviderRecord {
                        address: address.clone(),
                        state: Some(state.into()),
                        sub_state: Some(sub_state.into()),
                        extra: serde_json::Map::new(),
                    }
                })
                .collect())
        }
    }

    fn pipeline() -> Arc<EnrichmentPipeline> {
        let verifier = BatchVerifier::with_transport(
            Arc::new(DomainVerifier),
            Arc::new(VerificationCache::new(64, Duration::from_secs(60))),
        );
        let orchestrator = ResolutionOrchestrator::with_discovery_factory(Arc::new(|| {
            Err(AppError::Config("Discovery API key is not configured.".into()))
        }));
        Arc::new(EnrichmentPipeline::from_parts(verifier, orchestrator))
    }

    fn contact(first: &str, last: &str, email: Option<&str>) -> Contact {
        Contact {
            first_name: Some(first.into()),
            last_name: Some(last.into()),
            email: email.map(str::to_string),
            ..Contact::default()
        }
    }

    #[tokio::test]
    async fn test_process_contacts_keeps_input_order() {
        let contacts = vec![
            contact("Ada", "Lovelace", Some("ada@catchall.test")),
            contact("No", "Email", None),
            contact("Grace", "Hopper", Some("Grace@Navy.mil")),
            contact("Alan", "Turing", Some("alan@catchall.test")),
        ];
        let results = process_contacts(pipeline(), contacts, 1).await.unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].final_email(), Some("ada@catchall.test"));
        assert_eq!(
            results[0].resolution.as_ref().unwrap().path,
            ResolutionPath::Escalated
        );
        assert!(results[1].enrichment_skipped);
        assert_eq!(results[2].final_email(), Some("grace@navy.mil"));
        assert_eq!(
            results[2].resolution.as_ref().unwrap().status,
            VerificationStatus::Valid
        );
        assert_eq!(
            results[3].contact_input.first_name.as_deref(),
            Some("Alan")
        );

        let counts = status_counts(&results);
        assert_eq!(counts.get(&VerificationStatus::Catchall), Some(&2));
        assert_eq!(counts.get(&VerificationStatus::Valid), Some(&1));
    }

    #[tokio::test]
    async fn test_missing_name_is_not_escalated() {
        let contacts = vec![Contact {
            email: Some("someone@catchall.test".into()),
            ..Contact::default()
        }];
        let results = process_contacts(pipeline(), contacts, 4).await.unwrap();
        let resolution = results[0].resolution.as_ref().unwrap();
        assert_eq!(resolution.path, ResolutionPath::Direct);
        assert_eq!(resolution.status, VerificationStatus::Catchall);
        assert!(results[0].enrichment_reason.is_some());
    }

    #[tokio::test]
    async fn test_empty_input() {
        assert!(process_contacts(pipeline(), Vec::new(), 4)
            .await
            .unwrap()
            .is_empty());
    }
}
