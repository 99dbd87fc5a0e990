//! Cache Statistics Module
//!
//! Tracks cache activity: hits, misses, evictions and write-backs.

use serde::Serialize;

// == Cache Stats ==
/// Counters describing cache activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Accesses that found the key resident
    pub hits: u64,
    /// Accesses that loaded the key from the source
    pub misses: u64,
    /// Entries purged to make room for another key
    pub evictions: u64,
    /// Successful writes of dirty values to the source
    pub write_backs: u64,
    /// Asynchronous fetches issued
    pub prefetches: u64,
    /// Entries dropped without write-back
    pub invalidations: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current number of entries awaiting write-back
    pub dirty_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no accesses have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub(crate) fn record_write_back(&mut self) {
        self.write_backs += 1;
    }

    #[cfg(feature = "prefetch")]
    pub(crate) fn record_prefetch(&mut self) {
        self.prefetches += 1;
    }

    pub(crate) fn record_invalidation(&mut self) {
        self.invalidations += 1;
    }
}
