//! PromptCache implementation with FIFO eviction.

use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

use super::config::{CacheConfig, CacheConfigError};
use super::types::CacheStats;

/// Entries plus their insertion order.
///
/// `order` holds every key of `entries` exactly once, oldest first.
#[derive(Debug, Default)]
struct FifoStore {
    entries: HashMap<String, Bytes>,
    order: VecDeque<String>,
}

/// Bounded, insertion-ordered cache of generated images keyed by exact prompt.
///
/// Eviction is FIFO, not LRU: reading an entry does not refresh its position.
#[derive(Debug)]
pub struct PromptCache {
    /// The cache storage (prompt -> image bytes).
    store: RwLock<FifoStore>,
    /// Cache configuration.
    config: CacheConfig,
    /// Cache statistics.
    stats: RwLock<CacheStats>,
}

impl PromptCache {
    /// Create a new prompt cache with the given configuration.
    ///
    /// # Errors
    /// Returns `CacheConfigError` if the configuration is invalid.
    pub fn new(config: CacheConfig) -> Result<Self, CacheConfigError> {
        config.validate()?;

        Ok(Self {
            store: RwLock::new(FifoStore::default()),
            config,
            stats: RwLock::new(CacheStats::default()),
        })
    }

    /// Create a cache holding at most `max_entries` prompts.
    ///
    /// # Errors
    /// Returns `CacheConfigError` if `max_entries` is zero.
    pub fn with_capacity(max_entries: usize) -> Result<Self, CacheConfigError> {
        Self::new(CacheConfig { enabled: true, max_entries })
    }

    /// Look up the image stored for `prompt`.
    ///
    /// Always misses when caching is disabled.
    pub fn get(&self, prompt: &str) -> Option<Bytes> {
        if !self.config.enabled {
            return None;
        }

        let hit = {
            let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
            store.entries.get(prompt).cloned()
        };

        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        if hit.is_some() {
            stats.total_hits += 1;
            debug!(prompt_len = prompt.len(), "Prompt cache hit");
        } else {
            stats.total_misses += 1;
            debug!(prompt_len = prompt.len(), "Prompt cache miss");
        }

        hit
    }

    /// Store `bytes` for `prompt`, evicting the oldest entry if the cache is
    /// now over capacity.
    ///
    /// Re-inserting an existing prompt replaces its bytes but keeps its
    /// original position in the eviction order.
    ///
    /// # Returns
    /// The evicted prompt, if any.
    pub fn insert(&self, prompt: &str, bytes: Bytes) -> Option<String> {
        if !self.config.enabled {
            return None;
        }

        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        if store.entries.insert(prompt.to_string(), bytes).is_none() {
            store.order.push_back(prompt.to_string());
        }

        let mut evicted = None;
        if store.entries.len() > self.config.max_entries {
            evicted = store.order.pop_front();
            if let Some(oldest) = &evicted {
                store.entries.remove(oldest);
            }
        }

        let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
        stats.cache_size = store.entries.len();
        if let Some(oldest) = &evicted {
            stats.total_evictions += 1;
            info!(
                evicted_prompt_len = oldest.len(),
                cache_size = stats.cache_size,
                "Evicted oldest prompt from cache"
            );
        }

        evicted
    }

    /// Whether `prompt` is cached, without touching statistics.
    pub fn contains(&self, prompt: &str) -> bool {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        store.entries.contains_key(prompt)
    }

    /// Number of cached prompts.
    pub fn len(&self) -> usize {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        store.entries.len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached prompts, oldest first.
    pub fn keys(&self) -> Vec<String> {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        store.order.iter().cloned().collect()
    }

    /// Get current cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let mut result = self.stats.read().unwrap_or_else(PoisonError::into_inner).clone();
        result.cache_size = self.len();
        result
    }

    /// Drop every cached prompt.
    pub fn clear(&self) {
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        let cleared_count = store.entries.len();
        store.entries.clear();
        store.order.clear();
        self.stats.write().unwrap_or_else(PoisonError::into_inner).cache_size = 0;
        info!(cleared_count, "Cleared prompt cache");
    }
}
