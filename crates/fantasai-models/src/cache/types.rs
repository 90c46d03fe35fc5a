//! Core data types for prompt caching.

use serde::Serialize;

/// Cache statistics for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total number of cache hits.
    pub total_hits: u64,
    /// Total number of cache misses.
    pub total_misses: u64,
    /// Total number of evictions.
    pub total_evictions: u64,
    /// Current number of prompts in cache.
    pub cache_size: usize,
}

impl CacheStats {
    /// Fraction of lookups served from cache, `0.0` before any lookup.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.total_hits + self.total_misses;
        if lookups == 0 {
            return 0.0;
        }
        self.total_hits as f64 / lookups as f64
    }
}
