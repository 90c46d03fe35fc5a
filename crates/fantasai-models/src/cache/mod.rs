//! Prompt cache for generated images.
//!
//! Keeps the most recent successful generations in memory, keyed by the
//! exact prompt text, so repeated prompts never reach a provider. Bounded by
//! entry count and evicted in insertion order; nothing is persisted.

pub mod cache;
pub mod config;
pub mod types;

pub use cache::PromptCache;
pub use config::{CacheConfig, CacheConfigError};
pub use types::CacheStats;
