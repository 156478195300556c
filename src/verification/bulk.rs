//! Batched, cached verification client.

use super::cache::VerificationCache;
use super::status::map_status;
use super::transport::{HttpVerificationTransport, ProviderRecord, VerificationTransport};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::models::VerificationRecord;
use crate::utils::normalize_address;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

/// Maximum number of addresses the provider accepts per request.
pub const BATCH_SIZE: usize = 51;

/// Field names owned by [`VerificationRecord`]; provider extras never shadow them.
const RESERVED_FIELDS: [&str; 4] = ["address", "state", "sub_state", "mapped_status"];

/// Builds the cached record for a provider answer.
pub(crate) fn classify(raw: ProviderRecord) -> VerificationRecord {
    let state = raw.state.unwrap_or_default();
    let sub_state = raw.sub_state.unwrap_or_default();
    let mapped_status = map_status(&state, &sub_state);
    let mut extra = raw.extra;
    for key in RESERVED_FIELDS {
        extra.remove(key);
    }
    VerificationRecord {
        address: raw.address,
        state,
        sub_state,
        mapped_status,
        extra,
    }
}

/// Verifies addresses in provider-sized batches, serving repeats from cache.
#[derive(Clone)]
pub struct BatchVerifier {
    transport: Arc<dyn VerificationTransport>,
    cache: Arc<VerificationCache>,
}

impl BatchVerifier {
    /// Creates a verifier that talks to the configured HTTP provider.
    pub fn new(config: &Config) -> Result<Self> {
        let transport = HttpVerificationTransport::new(config)?;
        let cache = VerificationCache::new(config.cache_max_entries, config.cache_ttl);
        Ok(Self::with_transport(Arc::new(transport), Arc::new(cache)))
    }

    /// Creates a verifier over an arbitrary transport and cache.
    pub fn with_transport(
        transport: Arc<dyn VerificationTransport>,
        cache: Arc<VerificationCache>,
    ) -> Self {
        Self { transport, cache }
    }

    pub fn cache(&self) -> &VerificationCache {
        &self.cache
    }

    /// Verifies a set of addresses.
    ///
    /// Returns a map keyed by normalized address. Addresses the provider did
    /// not answer for are absent. Blank inputs are ignored, and an input with
    /// no usable address returns an empty map without a network call.
    ///
    /// # Errors
    /// A failed batch aborts the call with [`crate::AppError::VerificationProvider`].
    /// Records cached before the failure remain available to later calls.
    pub async fn verify<I, S>(&self, addresses: I) -> Result<HashMap<String, VerificationRecord>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let keys: Vec<String> = addresses
            .into_iter()
            .filter_map(|a| normalize_address(a.as_ref()))
            .filter(|k| seen.insert(k.clone()))
            .collect();

        let mut results = HashMap::with_capacity(keys.len());
        if keys.is_empty() {
            return Ok(results);
        }

        let mut misses = Vec::new();
        for key in keys {
            match self.cache.get(&key) {
                Some(record) => {
                    results.insert(key, record);
                }
                None => misses.push(key),
            }
        }
        tracing::debug!(target: "verification_bulk",
            "{} cache hits, {} misses", results.len(), misses.len());

        if misses.is_empty() {
            return Ok(results);
        }

        let total_batches = misses.len().div_ceil(BATCH_SIZE);
        for (index, batch) in misses.chunks(BATCH_SIZE).enumerate() {
            let task_label = format!("[Batch {}/{}]", index + 1, total_batches);
            let start_time = Instant::now();

            let records = match self.transport.verify_batch(batch).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::error!(target: "verification_bulk",
                        "{} Verification of {} addresses failed: {}", task_label, batch.len(), e);
                    return Err(e);
                }
            };

            let submitted: HashSet<&str> = batch.iter().map(String::as_str).collect();
            let mut answered = 0usize;
            for raw in records {
                let Some(key) = normalize_address(&raw.address) else {
                    continue;
                };
                if !submitted.contains(key.as_str()) {
                    tracing::warn!(target: "verification_bulk",
                        "{} Ignoring record for unrequested address {}", task_label, key);
                    continue;
                }
                let record = classify(raw);
                self.cache.insert(key.clone(), record.clone());
                results.insert(key, record);
                answered += 1;
            }

            if answered < batch.len() {
                tracing::warn!(target: "verification_bulk",
                    "{} Provider answered {} of {} addresses", task_label, answered, batch.len());
            }
            tracing::debug!(target: "verification_bulk",
                "{} Finished in {:.2?}", task_label, start_time.elapsed());
        }

        Ok(results)
    }
}
