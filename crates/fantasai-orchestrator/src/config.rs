//! TOML configuration for the orchestrator.
//!
//! Every section is optional; an empty file yields the built-in model catalog
//! against the hosted Hugging Face inference API.

use fantasai_abstraction::GenerationParameters;
use fantasai_models::huggingface::{API_KEY_ENV, DEFAULT_BASE_URL};
use fantasai_models::{CacheConfig, CacheConfigError, ModelConfig, ModelFactory, ModelType, PromptCache};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::descriptor::{ModelBinding, ModelDescriptor};
use crate::health::{DEFAULT_VALIDITY_WINDOW, HealthSettings};
use crate::orchestrator::ImageOrchestrator;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read or write the configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse (or serialize) the configuration.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<CacheConfigError> for ConfigError {
    fn from(err: CacheConfigError) -> Self {
        Self::InvalidValue(err.to_string())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Provider connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Inference API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; takes precedence over `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    API_KEY_ENV.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self { base_url: default_base_url(), api_key: None, api_key_env: default_api_key_env() }
    }
}

impl ProviderConfig {
    /// The configured key, or the value of `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Health tracking settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Seconds an unhealthy mark keeps a model out of rotation.
    #[serde(default = "default_validity_window_secs")]
    pub validity_window_secs: u64,
}

fn default_validity_window_secs() -> u64 {
    DEFAULT_VALIDITY_WINDOW.as_secs()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { validity_window_secs: default_validity_window_secs() }
    }
}

impl HealthConfig {
    /// Converts to runtime settings.
    #[must_use]
    pub fn settings(&self) -> HealthSettings {
        HealthSettings { validity_window: Duration::from_secs(self.validity_window_secs) }
    }
}

/// One `[[models]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSection {
    /// Provider model id.
    pub id: String,

    /// Lower is tried first.
    pub priority: i32,

    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,

    /// Provider kind (`huggingface`, `mock`).
    #[serde(default = "default_model_type")]
    pub model_type: String,

    /// Provider-specific generation options.
    #[serde(default)]
    pub parameters: GenerationParameters,
}

fn default_model_type() -> String {
    ModelType::HuggingFace.as_str().to_string()
}

impl ModelSection {
    /// The descriptor this entry describes.
    #[must_use]
    pub fn descriptor(&self) -> ModelDescriptor {
        ModelDescriptor::new(self.id.clone(), self.priority, Duration::from_millis(self.timeout_ms))
            .with_parameters(self.parameters.clone())
    }
}

impl From<&ModelDescriptor> for ModelSection {
    fn from(descriptor: &ModelDescriptor) -> Self {
        Self {
            id: descriptor.id.clone(),
            priority: descriptor.priority,
            timeout_ms: u64::try_from(descriptor.timeout.as_millis()).unwrap_or(u64::MAX),
            model_type: default_model_type(),
            parameters: descriptor.parameters.clone(),
        }
    }
}

fn default_models() -> Vec<ModelSection> {
    ModelDescriptor::default_catalog().iter().map(ModelSection::from).collect()
}

/// Complete orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Provider connection.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Health tracking.
    #[serde(default)]
    pub health: HealthConfig,

    /// Prompt cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Models to try; defaults to the built-in catalog.
    #[serde(default = "default_models")]
    pub models: Vec<ModelSection>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            health: HealthConfig::default(),
            cache: CacheConfig::default(),
            models: default_models(),
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        let config = Self::from_toml_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), models = config.models.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize: {}", e)))
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml_string()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::ReadError(format!("Failed to create directory: {}", e)))?;
        }

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("Failed to write file: {}", e)))
    }

    /// Check the configuration for values the orchestrator cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.models.is_empty() {
            return Err(ConfigError::InvalidValue("at least one model must be configured".to_string()));
        }

        if self.health.validity_window_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "health.validity_window_secs must be greater than 0".to_string(),
            ));
        }

        self.cache.validate()?;

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.id.trim().is_empty() {
                return Err(ConfigError::InvalidValue("model id must not be empty".to_string()));
            }
            if !seen.insert(model.id.as_str()) {
                return Err(ConfigError::InvalidValue(format!("duplicate model id '{}'", model.id)));
            }
            if model.timeout_ms == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "model '{}': timeout_ms must be greater than 0",
                    model.id
                )));
            }
            if ModelType::from_str(&model.model_type).is_err() {
                return Err(ConfigError::InvalidValue(format!(
                    "model '{}': unknown model_type '{}'",
                    model.id, model.model_type
                )));
            }
        }

        Ok(())
    }

    /// Descriptors for every configured model, in configuration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ModelDescriptor> {
        self.models.iter().map(ModelSection::descriptor).collect()
    }

    /// Provider client settings for one `[[models]]` entry.
    ///
    /// Hugging Face entries need a key from `provider.api_key` or the variable
    /// named by `provider.api_key_env`; no other source is consulted.
    pub fn model_config(&self, section: &ModelSection) -> ConfigResult<ModelConfig> {
        let model_type = ModelFactory::parse_type(&section.model_type)
            .map_err(|e| ConfigError::InvalidValue(format!("model '{}': {}", section.id, e)))?;

        let mut model_config = ModelConfig::new(model_type, section.id.clone())
            .with_base_url(self.provider.base_url.clone())
            .with_timeout(Duration::from_millis(section.timeout_ms));

        if model_type == ModelType::HuggingFace {
            let api_key = self.provider.resolve_api_key().ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "model '{}': no API key; set provider.api_key or the {} environment variable",
                    section.id, self.provider.api_key_env
                ))
            })?;
            model_config = model_config.with_api_key(api_key);
        }

        Ok(model_config)
    }

    /// Validate, create provider clients and assemble an orchestrator.
    pub fn build_orchestrator(&self) -> crate::error::Result<ImageOrchestrator> {
        self.validate()?;

        let mut bindings = Vec::with_capacity(self.models.len());
        for section in &self.models {
            let model = ModelFactory::create(self.model_config(section)?)?;
            bindings.push(ModelBinding::new(section.descriptor(), model));
        }

        let cache = PromptCache::new(self.cache.clone()).map_err(ConfigError::from)?;
        debug!(models = bindings.len(), "Building orchestrator from configuration");
        ImageOrchestrator::new(bindings, cache, self.health.settings())
    }
}
