//! Image model abstraction layer for Fantasai.
//!
//! This module defines the core traits and types for talking to
//! text-to-image providers.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Represents an error that can occur when interacting with an image model.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageError {
    /// The request could not be delivered (connection refused, DNS, TLS...).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The provider did not answer within the configured timeout.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// The provider answered with a non-2xx status.
    #[error("Provider returned HTTP {status}: {message}")]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
        /// The (truncated) response body.
        message: String,
    },

    /// The provider answered 2xx but the body was a JSON error payload.
    #[error("Provider Error: {0}")]
    ProviderError(String),

    /// The body was not usable image data.
    #[error("Invalid Image Payload: {0}")]
    InvalidPayload(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// The model provider is not supported or configured.
    #[error("Unsupported Model Provider: {0}")]
    UnsupportedModelProvider(String),
}

impl ImageError {
    /// Returns the HTTP status code carried by this error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classifies the error so callers can pick a user-facing response.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::HttpStatus { status, .. } => ErrorClass::from_status(*status),
            Self::Timeout { .. } => ErrorClass::Timeout,
            Self::ProviderError(message) => {
                // Hugging Face reports cold models as `{"error": "Model ... is currently loading"}`.
                if message.to_lowercase().contains("currently loading") {
                    ErrorClass::Unavailable
                } else {
                    ErrorClass::Other
                }
            }
            Self::InvalidPayload(_) => ErrorClass::InvalidPayload,
            Self::RequestError(_)
            | Self::SerializationError(_)
            | Self::UnsupportedModelProvider(_) => ErrorClass::Other,
        }
    }
}

/// Coarse failure category, preserved so the calling layer can map it to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Credentials were rejected (401/403).
    Authentication,
    /// The provider is throttling us (429).
    RateLimited,
    /// The provider is temporarily unavailable (503 or model still loading).
    Unavailable,
    /// The call exceeded its timeout.
    Timeout,
    /// The provider answered with something that is not an image.
    InvalidPayload,
    /// Anything else.
    Other,
}

impl ErrorClass {
    /// Maps an HTTP status code to its class.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimited,
            503 => Self::Unavailable,
            _ => Self::Other,
        }
    }
}

/// Provider-specific generation options (`num_inference_steps`, `guidance_scale`, ...).
///
/// Serialized as a plain JSON object so it can be spliced into request bodies
/// and read straight out of TOML configuration tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationParameters(Map<String, Value>);

impl GenerationParameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an option, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets an option, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Looks up an option.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a copy with `overrides` applied on top.
    #[must_use]
    pub fn merged_with(&self, overrides: &Self) -> Self {
        let mut merged = self.0.clone();
        for (key, value) in &overrides.0 {
            merged.insert(key.clone(), value.clone());
        }
        Self(merged)
    }

    /// Number of options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no options are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The image returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResponse {
    /// Raw image bytes.
    pub bytes: Bytes,

    /// Optional: The ID of the model that produced the image.
    pub model_id: Option<String>,

    /// Optional: The content type reported by the provider.
    pub content_type: Option<String>,
}

impl ImageResponse {
    /// Creates a response from raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self { bytes: bytes.into(), model_id: None, content_type: None }
    }

    /// Tags the response with the producing model.
    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Tags the response with a content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Size of the payload in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A trait for interacting with text-to-image models.
///
/// All models must be `Send + Sync` to allow concurrent use across threads.
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Generates an image for the given prompt.
    ///
    /// # Arguments
    /// * `prompt` - The text prompt
    /// * `parameters` - Provider-specific generation options
    ///
    /// # Errors
    /// Returns an `ImageError` if generation fails.
    async fn generate_image(
        &self,
        prompt: &str,
        parameters: &GenerationParameters,
    ) -> Result<ImageResponse, ImageError>;

    /// Returns the ID of the model.
    fn model_id(&self) -> &str;
}
