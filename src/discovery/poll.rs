//! Poll loop state machine and its delay schedule.

use super::candidate::select_best_candidate;
use super::transport::PollResponse;
use crate::core::config::{Config, DEFAULT_POLL_DELAYS_MS};
use crate::core::error::Result;
use crate::core::models::CandidateEmail;
use std::time::Duration;

/// Delays to wait before each poll attempt, and how many attempts to make.
///
/// The delay before attempt `n` (0-based) is `delays[n]`, clamped to the last
/// entry when `n` runs past the end of the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedule {
    delays: Vec<Duration>,
    max_attempts: u32,
}

impl PollSchedule {
    /// `max_attempts` is raised to 1 if zero.
    pub fn new(delays: Vec<Duration>, max_attempts: u32) -> Self {
        Self {
            delays,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.poll_delays.clone(), config.max_poll_attempts)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_before(&self, attempt: u32) -> Duration {
        let index = (attempt as usize).min(self.delays.len().saturating_sub(1));
        self.delays.get(index).copied().unwrap_or(Duration::ZERO)
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::new(
            DEFAULT_POLL_DELAYS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            5,
        )
    }
}

/// What a single poll attempt told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollObservation {
    /// The search is still running, or the attempt failed.
    NotReady,
    /// The search finished. The candidate is `None` when nothing acceptable was found.
    Terminal(Option<CandidateEmail>),
}

impl PollObservation {
    /// Interprets the outcome of one poll call.
    ///
    /// Transport failures, unsuccessful or empty responses, and statuses other
    /// than `FOUND`/`DEBITED` all count as not ready.
    pub fn from_response(response: Result<PollResponse>) -> Self {
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(target: "discovery", "Poll attempt failed, treating as not ready: {}", e);
                return PollObservation::NotReady;
            }
        };
        if !response.success {
            return PollObservation::NotReady;
        }
        let Some(item) = response.items.into_iter().next() else {
            return PollObservation::NotReady;
        };
        match item.status.trim().to_ascii_uppercase().as_str() {
            "FOUND" | "DEBITED" => {
                let emails = item.results.map(|r| r.emails).unwrap_or_default();
                PollObservation::Terminal(select_best_candidate(&emails))
            }
            "NONE" => PollObservation::NotReady,
            other => {
                tracing::debug!(target: "discovery", "Unrecognised search status {:?}, still waiting", other);
                PollObservation::NotReady
            }
        }
    }
}

/// States of the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Waiting to make attempt number `attempt` (0-based).
    Pending { attempt: u32 },
    /// A terminal status was observed.
    Ready(Option<CandidateEmail>),
    /// The attempt budget ran out without a terminal status.
    Exhausted,
}

impl PollState {
    pub fn start() -> Self {
        PollState::Pending { attempt: 0 }
    }

    /// Applies one observation. Only `Pending` moves; the other states are final.
    pub fn advance(self, observation: PollObservation, schedule: &PollSchedule) -> Self {
        match (self, observation) {
            (PollState::Pending { .. }, PollObservation::Terminal(candidate)) => {
                PollState::Ready(candidate)
            }
            (PollState::Pending { attempt }, PollObservation::NotReady) => {
                let next = attempt + 1;
                if next >= schedule.max_attempts() {
                    PollState::Exhausted
                } else {
                    PollState::Pending { attempt: next }
                }
            }
            (done, _) => done,
        }
    }
}
