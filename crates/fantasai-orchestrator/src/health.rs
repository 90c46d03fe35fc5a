//! Per-model health tracking.
//!
//! Health is a process-local belief: a model is marked unhealthy after a
//! failed attempt and healthy after a successful one. An unhealthy mark only
//! counts while it is fresh; once older than the validity window the model is
//! eligible for another try.

use chrono::{DateTime, Utc};
use fantasai_abstraction::ImageError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::debug;

/// How long an unhealthy mark keeps a model out of rotation.
pub const DEFAULT_VALIDITY_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Last known state of one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelHealth {
    /// Outcome of the last attempt (or `true` before any attempt).
    pub healthy: bool,
    /// When that outcome was recorded.
    pub last_checked_at: DateTime<Utc>,
    /// Error text of the last failure, if the last attempt failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ModelHealth {
    /// A healthy mark taken at `at`.
    #[must_use]
    pub fn healthy_at(at: DateTime<Utc>) -> Self {
        Self { healthy: true, last_checked_at: at, last_error: None }
    }

    /// An unhealthy mark taken at `at`.
    #[must_use]
    pub fn unhealthy_at(at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self { healthy: false, last_checked_at: at, last_error: Some(error.into()) }
    }

    /// Whether the model may be tried at `now`.
    ///
    /// Healthy models always may; unhealthy ones once the mark is strictly
    /// older than `window`. A mark from the future (clock skew) counts as fresh.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>, window: Duration) -> bool {
        if self.healthy {
            return true;
        }
        now.signed_duration_since(self.last_checked_at)
            .to_std()
            .is_ok_and(|elapsed| elapsed > window)
    }
}

/// Health settings for an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSettings {
    /// How long an unhealthy mark stays authoritative.
    pub validity_window: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self { validity_window: DEFAULT_VALIDITY_WINDOW }
    }
}

/// Health of every configured model, keyed by model id.
///
/// The key set is fixed at construction: updates for unknown ids are dropped,
/// so entries stay 1:1 with the configured models.
#[derive(Debug)]
pub struct HealthRegistry {
    entries: RwLock<HashMap<String, ModelHealth>>,
    validity_window: Duration,
}

impl HealthRegistry {
    /// Creates a registry with every model healthy as of now.
    pub fn new<I, S>(model_ids: I, settings: HealthSettings) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Utc::now();
        let entries = model_ids
            .into_iter()
            .map(|id| (id.into(), ModelHealth::healthy_at(now)))
            .collect();

        Self { entries: RwLock::new(entries), validity_window: settings.validity_window }
    }

    /// Current health of `model_id`.
    pub fn get(&self, model_id: &str) -> Option<ModelHealth> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(model_id).cloned()
    }

    /// Whether `model_id` may be tried at `now`. Unknown ids never are.
    pub fn is_usable(&self, model_id: &str, now: DateTime<Utc>) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(model_id)
            .is_some_and(|health| health.is_usable(now, self.validity_window))
    }

    /// Marks `model_id` healthy as of now.
    pub fn record_success(&self, model_id: &str) -> bool {
        self.set(model_id, ModelHealth::healthy_at(Utc::now()))
    }

    /// Marks `model_id` unhealthy as of now, remembering `error`.
    pub fn record_failure(&self, model_id: &str, error: &ImageError) -> bool {
        self.set(model_id, ModelHealth::unhealthy_at(Utc::now(), error.to_string()))
    }

    /// Replaces the health of a configured model.
    ///
    /// # Returns
    /// `false` (and no change) if `model_id` is not configured.
    pub fn set(&self, model_id: &str, health: ModelHealth) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(model_id) {
            Some(entry) => {
                debug!(model_id = %model_id, healthy = health.healthy, "Updated model health");
                *entry = health;
                true
            }
            None => false,
        }
    }

    /// Copy of every entry.
    pub fn snapshot(&self) -> HashMap<String, ModelHealth> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn registry() -> HealthRegistry {
        HealthRegistry::new(["a", "b"], HealthSettings::default())
    }

    #[test]
    fn test_all_models_start_healthy() {
        let registry = registry();
        assert_eq!(registry.snapshot().len(), 2);
        let now = Utc::now();
        assert!(registry.is_usable("a", now));
        assert!(registry.is_usable("b", now));
        assert!(registry.get("a").unwrap().last_error.is_none());
    }

    #[test]
    fn test_fresh_failure_blocks_model() {
        let registry = registry();
        let err = ImageError::HttpStatus { status: 503, message: "down".to_string() };
        assert!(registry.record_failure("a", &err));

        let health = registry.get("a").unwrap();
        assert!(!health.healthy);
        assert_eq!(health.last_error.as_deref(), Some("Provider returned HTTP 503: down"));
        assert!(!registry.is_usable("a", Utc::now()));
        assert!(registry.is_usable("b", Utc::now()));
    }

    #[test]
    fn test_stale_failure_is_retryable() {
        let registry = registry();
        let now = Utc::now();
        registry.set("a", ModelHealth::unhealthy_at(now - TimeDelta::minutes(6), "old"));
        registry.set("b", ModelHealth::unhealthy_at(now - TimeDelta::minutes(4), "recent"));

        assert!(registry.is_usable("a", now));
        assert!(!registry.is_usable("b", now));
    }

    #[test]
    fn test_window_boundary_is_exclusive() {
        let now = Utc::now();
        let health = ModelHealth::unhealthy_at(now - TimeDelta::seconds(300), "edge");
        assert!(!health.is_usable(now, DEFAULT_VALIDITY_WINDOW));
        assert!(health.is_usable(now + TimeDelta::milliseconds(1), DEFAULT_VALIDITY_WINDOW));
    }

    #[test]
    fn test_future_mark_counts_as_fresh() {
        let now = Utc::now();
        let health = ModelHealth::unhealthy_at(now + TimeDelta::minutes(10), "skewed");
        assert!(!health.is_usable(now, DEFAULT_VALIDITY_WINDOW));
    }

    #[test]
    fn test_success_clears_error() {
        let registry = registry();
        registry.record_failure("a", &ImageError::Timeout { timeout_ms: 10 });
        assert!(registry.record_success("a"));

        let health = registry.get("a").unwrap();
        assert!(health.healthy);
        assert!(health.last_error.is_none());
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let registry = registry();
        assert!(!registry.record_success("ghost"));
        assert!(!registry.set("ghost", ModelHealth::healthy_at(Utc::now())));
        assert!(!registry.is_usable("ghost", Utc::now()));
        assert_eq!(registry.snapshot().len(), 2);
        assert!(!registry.snapshot().contains_key("ghost"));
    }
}
