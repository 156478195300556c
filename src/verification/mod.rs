//! Bulk address verification: provider transport, status mapping and the
//! TTL/LRU cache in front of it.

pub mod bulk;
pub mod cache;
pub mod status;
pub mod transport;

pub use bulk::{BatchVerifier, BATCH_SIZE};
pub use cache::{CacheStats, VerificationCache};
pub use status::map_status;
pub use transport::{HttpVerificationTransport, ProviderRecord, VerificationTransport};
