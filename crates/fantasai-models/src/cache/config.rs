//! Configuration for the prompt cache.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for the prompt cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Whether prompt caching is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum number of prompts kept in memory (default: 100).
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_max_entries() -> usize {
    100
}

/// Errors that can occur during cache configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheConfigError {
    /// Invalid max entries (must be > 0).
    #[error("Invalid max cache entries: must be greater than 0")]
    InvalidMaxEntries,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: default_enabled(), max_entries: default_max_entries() }
    }
}

impl CacheConfig {
    /// Validate the cache configuration.
    ///
    /// # Errors
    /// Returns `CacheConfigError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), CacheConfigError> {
        if self.max_entries == 0 {
            return Err(CacheConfigError::InvalidMaxEntries);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_entries, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_config_validation_invalid_max_entries() {
        let config = CacheConfig { enabled: true, max_entries: 0 };
        assert_eq!(config.validate(), Err(CacheConfigError::InvalidMaxEntries));
    }

    #[test]
    fn test_cache_config_serde_defaults() {
        let config: CacheConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CacheConfig::default());

        let config: CacheConfig = serde_json::from_str(r#"{"max_entries": 5}"#).unwrap();
        assert_eq!(config.max_entries, 5);
        assert!(config.enabled);
    }
}
