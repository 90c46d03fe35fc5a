//! Multi-provider image generation with health-aware fallback.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use fantasai_abstraction::{ImageError, ImageResponse};
use fantasai_models::{CacheStats, PromptCache, validate_image};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;
use crate::descriptor::{ModelBinding, ModelDescriptor};
use crate::error::{AttemptFailure, OrchestrationError, Result};
use crate::health::{HealthRegistry, HealthSettings, ModelHealth};

/// The image handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub bytes: Bytes,
    /// The model that produced them; `None` when served from cache.
    pub model_id: Option<String>,
    /// Whether the prompt cache answered.
    pub from_cache: bool,
}

/// Orchestrates image generation across a prioritized list of models.
///
/// Owns its health registry and prompt cache; share it behind an `Arc` to
/// serve concurrent requests.
#[derive(Debug)]
pub struct ImageOrchestrator {
    /// Bindings in configuration order.
    bindings: Vec<ModelBinding>,
    /// Health of every binding, keyed by descriptor id.
    health: HealthRegistry,
    /// Prompt -> image cache.
    cache: PromptCache,
}

impl ImageOrchestrator {
    /// Creates an orchestrator over `bindings`.
    ///
    /// # Errors
    /// Returns `OrchestrationError::Config` if `bindings` is empty or two
    /// bindings share an id.
    pub fn new(bindings: Vec<ModelBinding>, cache: PromptCache, settings: HealthSettings) -> Result<Self> {
        if bindings.is_empty() {
            return Err(ConfigError::InvalidValue("at least one model must be configured".to_string()).into());
        }

        let mut seen = HashSet::new();
        for binding in &bindings {
            if !seen.insert(binding.descriptor.id.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate model id '{}'",
                    binding.descriptor.id
                ))
                .into());
            }
        }

        let health = HealthRegistry::new(bindings.iter().map(|b| b.descriptor.id.clone()), settings);
        info!(models = bindings.len(), "Image orchestrator ready");

        Ok(Self { bindings, health, cache })
    }

    /// Generates an image for `prompt`.
    ///
    /// Serves from cache when possible, otherwise tries every usable model in
    /// ascending priority until one returns a valid image. Individual provider
    /// failures only update health; the caller sees an error solely when no
    /// model was usable or every attempt failed.
    ///
    /// # Errors
    /// `InvalidPrompt` for an empty prompt, `NoHealthyModels` when every model
    /// is inside its unhealthy window, `Exhausted` when all attempts failed.
    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        if prompt.is_empty() {
            return Err(OrchestrationError::InvalidPrompt("Prompt is required".to_string()));
        }

        debug!(prompt_len = prompt.len(), "Starting image generation");

        if let Some(bytes) = self.cache.get(prompt) {
            debug!(hit_rate = self.cache.stats().hit_rate(), "Serving image from prompt cache");
            return Ok(GeneratedImage { bytes, model_id: None, from_cache: true });
        }

        let candidates = self.candidates(Utc::now());
        if candidates.is_empty() {
            error!(configured = self.bindings.len(), "No healthy models available");
            return Err(OrchestrationError::NoHealthyModels { configured: self.bindings.len() });
        }

        debug!(candidates = candidates.len(), "Attempting generation");

        let mut failures = Vec::new();
        for (attempt, binding) in candidates.into_iter().enumerate() {
            let model_id = &binding.descriptor.id;

            match Self::attempt(binding, prompt).await {
                Ok(response) => {
                    self.health.record_success(model_id);
                    self.cache.insert(prompt, response.bytes.clone());
                    info!(
                        model_id = %model_id,
                        attempt = attempt + 1,
                        bytes = response.len(),
                        "Generated image"
                    );
                    return Ok(GeneratedImage {
                        bytes: response.bytes,
                        model_id: Some(model_id.clone()),
                        from_cache: false,
                    });
                }
                Err(err) => {
                    warn!(
                        model_id = %model_id,
                        attempt = attempt + 1,
                        error = %err,
                        "Model failed, falling back"
                    );
                    self.health.record_failure(model_id, &err);
                    failures.push(AttemptFailure { model_id: model_id.clone(), error: err });
                }
            }
        }

        error!(attempts = failures.len(), "All models failed to generate image");
        Err(OrchestrationError::Exhausted { failures })
    }

    /// Models that may be tried at `now`, lowest priority value first.
    ///
    /// Ties keep configuration order.
    fn candidates(&self, now: DateTime<Utc>) -> Vec<&ModelBinding> {
        let mut candidates: Vec<&ModelBinding> = self
            .bindings
            .iter()
            .filter(|binding| {
                let usable = self.health.is_usable(&binding.descriptor.id, now);
                if !usable {
                    let last_error = self
                        .health
                        .get(&binding.descriptor.id)
                        .and_then(|h| h.last_error)
                        .unwrap_or_default();
                    warn!(
                        model_id = %binding.descriptor.id,
                        last_error = %last_error,
                        "Skipping unhealthy model"
                    );
                }
                usable
            })
            .collect();

        candidates.sort_by_key(|binding| binding.descriptor.priority);
        candidates
    }

    /// A single bounded call to one model, validated.
    async fn attempt(binding: &ModelBinding, prompt: &str) -> std::result::Result<ImageResponse, ImageError> {
        let descriptor = &binding.descriptor;
        let call = binding.model.generate_image(prompt, &descriptor.parameters);

        let response = tokio::time::timeout(descriptor.timeout, call).await.map_err(|_| {
            ImageError::Timeout { timeout_ms: u64::try_from(descriptor.timeout.as_millis()).unwrap_or(u64::MAX) }
        })??;

        validate_image(&response.bytes)?;
        Ok(response)
    }

    /// Descriptors in priority order.
    pub fn descriptors(&self) -> Vec<&ModelDescriptor> {
        let mut descriptors: Vec<&ModelDescriptor> = self.bindings.iter().map(|b| &b.descriptor).collect();
        descriptors.sort_by_key(|d| d.priority);
        descriptors
    }

    /// Every descriptor with its current health, in priority order.
    pub fn health_snapshot(&self) -> Vec<(ModelDescriptor, ModelHealth)> {
        let snapshot = self.health.snapshot();
        self.descriptors()
            .into_iter()
            .filter_map(|d| snapshot.get(&d.id).map(|h| (d.clone(), h.clone())))
            .collect()
    }

    /// The health registry.
    #[must_use]
    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// The prompt cache.
    #[must_use]
    pub fn cache(&self) -> &PromptCache {
        &self.cache
    }

    /// Prompt cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use fantasai_abstraction::ImageModel;
    use fantasai_models::MockImageModel;
    use std::sync::Arc;
    use std::time::Duration;

    fn png(tag: u8) -> Bytes {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.resize(256, tag);
        Bytes::from(data)
    }

    fn bind(id: &str, priority: i32, model: &Arc<MockImageModel>) -> ModelBinding {
        let model: Arc<dyn ImageModel> = model.clone();
        ModelBinding::new(ModelDescriptor::new(id, priority, Duration::from_secs(5)), model)
    }

    fn orchestrator(bindings: Vec<ModelBinding>) -> ImageOrchestrator {
        ImageOrchestrator::new(bindings, PromptCache::with_capacity(10).unwrap(), HealthSettings::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_healthy_model_wins() {
        let a = Arc::new(MockImageModel::returning("a", png(1)));
        let b = Arc::new(MockImageModel::returning("b", png(2)));
        let orch = orchestrator(vec![bind("a", 1, &a), bind("b", 2, &b)]);

        let image = orch.generate("a cat").await.unwrap();

        assert_eq!(image.bytes, png(1));
        assert_eq!(image.model_id.as_deref(), Some("a"));
        assert!(!image.from_cache);
        assert_eq!(b.call_count(), 0);
    }

    #[tokio::test]
    async fn test_priority_not_configuration_order() {
        let low = Arc::new(MockImageModel::returning("low", png(1)));
        let high = Arc::new(MockImageModel::returning("high", png(2)));
        let orch = orchestrator(vec![bind("low", 5, &low), bind("high", 1, &high)]);

        let image = orch.generate("a cat").await.unwrap();

        assert_eq!(image.model_id.as_deref(), Some("high"));
        assert_eq!(low.call_count(), 0);
        let order: Vec<&str> = orch.descriptors().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(order, vec!["high", "low"]);
    }

    #[tokio::test]
    async fn test_repeated_prompt_is_served_from_cache() {
        let a = Arc::new(MockImageModel::returning("a", png(1)));
        let orch = orchestrator(vec![bind("a", 1, &a)]);

        let first = orch.generate("a cat").await.unwrap();
        let second = orch.generate("a cat").await.unwrap();

        assert_eq!(first.bytes, second.bytes);
        assert!(second.from_cache);
        assert_eq!(second.model_id, None);
        assert_eq!(a.call_count(), 1);
        assert_eq!(orch.cache_stats().total_hits, 1);
    }

    #[tokio::test]
    async fn test_fallback_updates_health_of_both_models() {
        let a = Arc::new(MockImageModel::failing(
            "a",
            ImageError::HttpStatus { status: 500, message: "boom".to_string() },
        ));
        let b = Arc::new(MockImageModel::returning("b", png(2)));
        let orch = orchestrator(vec![bind("a", 1, &a), bind("b", 2, &b)]);

        let image = orch.generate("a cat").await.unwrap();

        assert_eq!(image.bytes, png(2));
        assert!(!orch.health().get("a").unwrap().healthy);
        assert!(orch.health().get("b").unwrap().healthy);
        assert_eq!(orch.cache().get("a cat"), Some(png(2)));
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_next_model() {
        let slow = Arc::new(MockImageModel::returning("slow", png(1)).with_delay(Duration::from_secs(30)));
        let fast = Arc::new(MockImageModel::returning("fast", png(2)));
        let slow_binding = ModelBinding::new(
            ModelDescriptor::new("slow", 1, Duration::from_millis(50)),
            slow.clone() as Arc<dyn ImageModel>,
        );
        let orch = orchestrator(vec![slow_binding, bind("fast", 2, &fast)]);

        let image = orch.generate("a cat").await.unwrap();

        assert_eq!(image.model_id.as_deref(), Some("fast"));
        let slow_health = orch.health().get("slow").unwrap();
        assert!(!slow_health.healthy);
        assert_eq!(slow_health.last_error.as_deref(), Some("Request timed out after 50ms"));
    }

    #[tokio::test]
    async fn test_small_and_json_error_payloads_are_failures() {
        let tiny = Arc::new(MockImageModel::returning("tiny", vec![1_u8; 100]));
        let json = Arc::new(MockImageModel::returning("json", &br#"{"error":"Model is currently loading"}"#[..]));
        let good = Arc::new(MockImageModel::returning("good", png(3)));
        let orch = orchestrator(vec![bind("tiny", 1, &tiny), bind("json", 2, &json), bind("good", 3, &good)]);

        let image = orch.generate("a cat").await.unwrap();

        assert_eq!(image.model_id.as_deref(), Some("good"));
        assert_eq!(tiny.call_count(), 1);
        assert_eq!(json.call_count(), 1);
        assert!(!orch.health().get("tiny").unwrap().healthy);
        assert_eq!(
            orch.health().get("json").unwrap().last_error.as_deref(),
            Some("Provider Error: Model is currently loading")
        );
    }

    #[tokio::test]
    async fn test_all_unhealthy_fails_fast_without_calls() {
        let a = Arc::new(MockImageModel::returning("a", png(1)));
        let b = Arc::new(MockImageModel::returning("b", png(2)));
        let orch = orchestrator(vec![bind("a", 1, &a), bind("b", 2, &b)]);
        let now = Utc::now();
        orch.health().set("a", ModelHealth::unhealthy_at(now - TimeDelta::minutes(1), "down"));
        orch.health().set("b", ModelHealth::unhealthy_at(now - TimeDelta::minutes(2), "down"));

        let err = orch.generate("a cat").await.unwrap_err();

        assert!(matches!(err, OrchestrationError::NoHealthyModels { configured: 2 }));
        assert_eq!(a.call_count() + b.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_unhealthy_model_is_retried() {
        let a = Arc::new(MockImageModel::returning("a", png(1)));
        let orch = orchestrator(vec![bind("a", 1, &a)]);
        orch.health().set("a", ModelHealth::unhealthy_at(Utc::now() - TimeDelta::minutes(6), "old"));

        let image = orch.generate("a cat").await.unwrap();

        assert_eq!(image.model_id.as_deref(), Some("a"));
        assert!(orch.health().get("a").unwrap().healthy);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_every_attempt() {
        let a = Arc::new(MockImageModel::failing("a", ImageError::Timeout { timeout_ms: 40_000 }));
        let b = Arc::new(MockImageModel::failing(
            "b",
            ImageError::HttpStatus { status: 429, message: "slow down".to_string() },
        ));
        let orch = orchestrator(vec![bind("a", 1, &a), bind("b", 2, &b)]);

        let err = orch.generate("a cat").await.unwrap_err();

        let failures = err.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].model_id, "a");
        assert_eq!(failures[1].model_id, "b");
        assert_eq!(err.class(), fantasai_abstraction::ErrorClass::RateLimited);
        assert!(orch.cache().is_empty());

        // Both are now freshly unhealthy: the next call fails fast.
        let err = orch.generate("a dog").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::NoHealthyModels { .. }));
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected() {
        let a = Arc::new(MockImageModel::new("a"));
        let orch = orchestrator(vec![bind("a", 1, &a)]);

        let err = orch.generate("").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::InvalidPrompt(_)));
        assert_eq!(a.call_count(), 0);
    }

    #[test]
    fn test_construction_rejects_empty_and_duplicate_models() {
        let err = ImageOrchestrator::new(Vec::new(), PromptCache::with_capacity(1).unwrap(), HealthSettings::default())
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Config(_)));

        let a = Arc::new(MockImageModel::new("a"));
        let err = ImageOrchestrator::new(
            vec![bind("a", 1, &a), bind("a", 2, &a)],
            PromptCache::with_capacity(1).unwrap(),
            HealthSettings::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate model id 'a'"));
    }

    #[test]
    fn test_health_snapshot_is_one_to_one() {
        let a = Arc::new(MockImageModel::new("a"));
        let b = Arc::new(MockImageModel::new("b"));
        let orch = orchestrator(vec![bind("b", 2, &b), bind("a", 1, &a)]);

        let snapshot = orch.health_snapshot();
        let ids: Vec<&str> = snapshot.iter().map(|(d, _)| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(snapshot.iter().all(|(_, h)| h.healthy));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_generation_keeps_cache_bounded() {
        let model = Arc::new(MockImageModel::new("a").with_delay(Duration::from_millis(5)));
        let orch = Arc::new(
            ImageOrchestrator::new(
                vec![bind("a", 1, &model)],
                PromptCache::with_capacity(4).unwrap(),
                HealthSettings::default(),
            )
            .unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..50 {
            let orch = Arc::clone(&orch);
            let prompt = format!("prompt {}", i % 10);
            handles.push(tokio::spawn(async move { orch.generate(&prompt).await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        let keys = orch.cache().keys();
        let unique: HashSet<&String> = keys.iter().collect();
        assert!(orch.cache().len() <= 4);
        assert_eq!(keys.len(), orch.cache().len());
        assert_eq!(unique.len(), keys.len());
        assert!(model.call_count() >= 10);
    }
}
