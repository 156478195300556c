//! Two-phase discovery client: initiate a search, then poll for its result.

use super::poll::{PollObservation, PollSchedule, PollState};
use super::transport::{DiscoveryTransport, HttpDiscoveryTransport, SearchRequest, SearchTicket};
use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::CandidateEmail;

use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;

/// Cloning is cheap; clones share one transport and its connection pool.
#[derive(Clone)]
pub struct DiscoveryClient {
    transport: Arc<dyn DiscoveryTransport>,
    schedule: PollSchedule,
}

impl DiscoveryClient {
    /// Creates a client for the configured HTTP provider.
    ///
    /// # Errors
    /// [`AppError::Config`] when the discovery API key is not configured.
    pub fn new(config: &Config) -> Result<Self> {
        let transport = HttpDiscoveryTransport::new(config)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            PollSchedule::from_config(config),
        ))
    }

    pub fn with_transport(transport: Arc<dyn DiscoveryTransport>, schedule: PollSchedule) -> Self {
        Self {
            transport,
            schedule,
        }
    }

    #[cfg(test)]
    pub(crate) fn shares_transport_with(&self, other: &DiscoveryClient) -> bool {
        Arc::ptr_eq(&self.transport, &other.transport)
    }

    /// Starts a search for `first last` at `domain`.
    ///
    /// Returns `Ok(None)` when the provider declines the search or the input
    /// is blank; the caller should treat that as "no discovery possible".
    ///
    /// # Errors
    /// * [`AppError::InsufficientCredits`] when the account is out of credits.
    /// * Transport failures from the underlying [`DiscoveryTransport`].
    pub async fn initiate(
        &self,
        first_name: &str,
        last_name: &str,
        domain: &str,
    ) -> Result<Option<SearchTicket>> {
        let request = SearchRequest {
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            domain_or_company: domain.trim().to_string(),
        };
        if request.first_name.is_empty()
            || request.last_name.is_empty()
            || request.domain_or_company.is_empty()
        {
            tracing::debug!(target: "discovery", "Skipping search with blank input: {:?}", request);
            return Ok(None);
        }

        let response = self.transport.initiate(&request).await?;

        if !response.success {
            if response.is_insufficient_credits() {
                tracing::error!(target: "discovery", "Discovery account is out of credits");
                return Err(AppError::InsufficientCredits(
                    "Discovery provider reported insufficient credits".to_string(),
                ));
            }
            let reasons: Vec<&str> = response
                .validation_errors
                .iter()
                .filter_map(|e| e.kind.as_deref().or(e.message.as_deref()))
                .collect();
            tracing::warn!(target: "discovery",
                "Search for {} {} @ {} was declined: {:?}",
                request.first_name, request.last_name, request.domain_or_company, reasons);
            return Ok(None);
        }

        match response.item.map(|item| item.id) {
            Some(id) if !id.trim().is_empty() => Ok(Some(SearchTicket::new(id))),
            _ => {
                tracing::warn!(target: "discovery", "Search accepted but no search id was returned");
                Ok(None)
            }
        }
    }

    /// Polls a search until it finishes or the attempt budget runs out.
    ///
    /// Returns the best candidate, or `None` when the search found nothing
    /// acceptable or did not finish in time. Failed attempts are not errors.
    pub async fn poll(&self, ticket: SearchTicket) -> Option<CandidateEmail> {
        let task_label = format!("[Search {}]", ticket.as_str());
        let start_time = Instant::now();
        let mut state = PollState::start();

        loop {
            match state {
                PollState::Pending { attempt } => {
                    sleep(self.schedule.delay_before(attempt)).await;
                    tracing::debug!(target: "discovery", "{} Poll attempt {}/{}",
                        task_label, attempt + 1, self.schedule.max_attempts());
                    let observation =
                        PollObservation::from_response(self.transport.poll(&ticket).await);
                    state = state.advance(observation, &self.schedule);
                }
                PollState::Ready(candidate) => {
                    tracing::info!(target: "discovery", "{} Finished in {:.2?}. Candidate: {:?}",
                        task_label, start_time.elapsed(), candidate);
                    return candidate;
                }
                PollState::Exhausted => {
                    tracing::info!(target: "discovery", "{} No result after {} attempts ({:.2?})",
                        task_label, self.schedule.max_attempts(), start_time.elapsed());
                    return None;
                }
            }
        }
    }

    /// Runs a full search: initiate, then poll.
    pub async fn search(
        &self,
        first_name: &str,
        last_name: &str,
        domain: &str,
    ) -> Result<Option<CandidateEmail>> {
        match self.initiate(first_name, last_name, domain).await? {
            Some(ticket) => Ok(self.poll(ticket).await),
            None => Ok(None),
        }
    }
}
