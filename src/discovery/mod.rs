//! Search-based email discovery used to break ties on catchall domains.

pub mod candidate;
pub mod client;
pub mod poll;
pub mod transport;

pub use candidate::select_best_candidate;
pub use client::DiscoveryClient;
pub use poll::{PollObservation, PollSchedule, PollState};
pub use transport::{
    DiscoveryTransport, HttpDiscoveryTransport, InitiateItem, InitiateResponse, PollItem,
    PollResponse, PollResults, RawEmail, SearchRequest, SearchTicket, ValidationError,
};
