//! Builds `ImageModel` clients from a provider kind and model id.
//!
//! Hugging Face clients fall back to `HUGGINGFACE_API_KEY` when no key is
//! supplied.

use crate::{HuggingFaceModel, MockImageModel};
use fantasai_abstraction::{ImageError, ImageModel};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Supported provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    /// Mock model for testing and offline use.
    Mock,
    /// Hugging Face hosted inference model.
    HuggingFace,
}

impl FromStr for ModelType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "huggingface" | "hugging-face" | "hf" => Ok(Self::HuggingFace),
            _ => Err(()),
        }
    }
}

impl ModelType {
    /// Canonical configuration name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::HuggingFace => "huggingface",
        }
    }
}

/// Model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// The type of model to create.
    pub model_type: ModelType,
    /// The model ID (e.g., "runwayml/stable-diffusion-v1-5").
    pub model_id: String,
    /// Optional API key (if not provided, will be loaded from environment).
    pub api_key: Option<String>,
    /// Optional base URL override for the provider.
    pub base_url: Option<String>,
    /// Optional per-request timeout.
    pub timeout: Option<Duration>,
}

impl ModelConfig {
    /// Creates a new `ModelConfig` with the given type and model ID.
    #[must_use]
    pub fn new(model_type: ModelType, model_id: String) -> Self {
        Self { model_type, model_id, api_key: None, base_url: None, timeout: None }
    }

    /// Sets the API key for this configuration.
    #[must_use]
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Sets the base URL for this configuration.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Creates provider clients.
pub struct ModelFactory;

impl ModelFactory {
    /// Creates a model instance from the given configuration.
    ///
    /// # Errors
    /// Returns an `ImageError` if model creation fails (e.g., missing API key).
    pub fn create(config: ModelConfig) -> Result<Arc<dyn ImageModel>, ImageError> {
        debug!(
            model_type = ?config.model_type,
            model_id = %config.model_id,
            "Creating model instance"
        );

        match config.model_type {
            ModelType::Mock => Ok(Arc::new(MockImageModel::new(config.model_id))),
            ModelType::HuggingFace => {
                let mut model = if let Some(api_key) = config.api_key {
                    HuggingFaceModel::with_api_key(config.model_id, api_key)
                } else {
                    HuggingFaceModel::new(config.model_id)?
                };
                if let Some(base_url) = config.base_url {
                    model = model.with_base_url(base_url);
                }
                if let Some(timeout) = config.timeout {
                    model = model.with_timeout(timeout);
                }
                Ok(Arc::new(model))
            }
        }
    }

    /// Parses a model type name.
    ///
    /// # Errors
    /// Returns `UnsupportedModelProvider` for unknown names.
    pub fn parse_type(model_type_str: &str) -> Result<ModelType, ImageError> {
        ModelType::from_str(model_type_str).map_err(|()| {
            error!(model_type = %model_type_str, "Unrecognized model type");
            ImageError::UnsupportedModelProvider(format!(
                "Unrecognized model type: {}",
                model_type_str
            ))
        })
    }
}
