//! Bounded, time-expiring cache of verification records.
//!
//! Keys are normalized addresses. Entries older than the TTL are treated as
//! absent and evicted on the lookup that finds them. When the cache is full,
//! the least recently *accessed* entry is evicted first.
//!
//! All operations take the cache lock for their whole duration, so a lookup
//! never observes a partially inserted or partially evicted entry.

use crate::core::models::VerificationRecord;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;

struct CacheEntry {
    record: VerificationRecord,
    inserted_at: Instant,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries, including expired ones not yet evicted.
    pub len: usize,
    /// Maximum number of entries.
    pub cap: usize,
}

pub struct VerificationCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl VerificationCache {
    /// Creates a cache holding at most `max_entries` records for `ttl` each.
    /// A `max_entries` of zero is treated as one.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
            ttl,
        }
    }

    /// Returns a fresh record for `key`, marking it most recently used.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<VerificationRecord> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            None => return None,
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.record.clone());
            }
            Some(_) => {}
        }
        entries.pop(key);
        tracing::trace!(target: "verification_cache", "Evicted expired entry for {}", key);
        None
    }

    /// Inserts or replaces the record for `key`, evicting the least recently
    /// used entry if the cache is full.
    pub fn insert(&self, key: String, record: VerificationRecord) {
        let entry = CacheEntry {
            record,
            inserted_at: Instant::now(),
        };
        let mut entries = self.entries.lock();
        if let Some((evicted_key, _)) = entries.push(key.clone(), entry) {
            if evicted_key != key {
                tracing::trace!(target: "verification_cache", "Evicted LRU entry for {}", evicted_key);
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            len: entries.len(),
            cap: entries.cap().get(),
        }
    }

    /// Whether `key` is present, without touching recency or TTL.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains(key)
    }
}

impl std::fmt::Debug for VerificationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("VerificationCache")
            .field("len", &stats.len)
            .field("cap", &stats.cap)
            .field("ttl", &self.ttl)
            .finish()
    }
}
