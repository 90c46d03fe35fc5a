//! Hugging Face inference API implementation.
//!
//! This module provides an implementation of the `ImageModel` trait for the
//! hosted text-to-image endpoints at `api-inference.huggingface.co`.

use async_trait::async_trait;
use fantasai_abstraction::{GenerationParameters, ImageError, ImageModel, ImageResponse};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::{debug, error};

use crate::payload::{ImageFormat, extract_image};

/// Default endpoint for the hosted inference API.
pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Environment variable holding the API token.
pub const API_KEY_ENV: &str = "HUGGINGFACE_API_KEY";

/// Longest error body kept in an `ImageError`.
const MAX_ERROR_CHARS: usize = 500;

/// Hugging Face text-to-image model.
#[derive(Debug, Clone)]
pub struct HuggingFaceModel {
    /// The model ID (e.g., "stabilityai/stable-diffusion-xl-base-1.0").
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the inference API.
    base_url: String,
    /// Per-request timeout, if any.
    timeout: Option<Duration>,
    /// HTTP client for making requests.
    client: Client,
}

impl HuggingFaceModel {
    /// Creates a new `HuggingFaceModel` reading the token from `HUGGINGFACE_API_KEY`.
    ///
    /// # Errors
    /// Returns an `ImageError` if the variable is unset or empty.
    pub fn new(model_id: String) -> Result<Self, ImageError> {
        let api_key = require_key(env::var(API_KEY_ENV).ok())?;
        Ok(Self::with_api_key(model_id, api_key))
    }

    /// Creates a new `HuggingFaceModel` with a custom API key.
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self {
            model_id,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
            client: Client::new(),
        }
    }

    /// Points the model at a different inference host (mirrors, test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Bounds each request by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The endpoint this model posts to.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}", self.base_url.trim_end_matches('/'), self.model_id)
    }

    /// Builds the JSON request body.
    fn request_body<'a>(prompt: &'a str, parameters: &GenerationParameters) -> HuggingFaceRequest<'a> {
        let forced = GenerationParameters::new()
            .with("return_full_object", true)
            .with("wait_for_model", true);

        HuggingFaceRequest { inputs: prompt, parameters: parameters.merged_with(&forced) }
    }

    fn transport_error(&self, err: &reqwest::Error) -> ImageError {
        if err.is_timeout() {
            let timeout_ms = self.timeout.map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
            ImageError::Timeout { timeout_ms }
        } else {
            ImageError::RequestError(format!("Network error: {}", err))
        }
    }

    /// Pulls a readable message out of an error body.
    fn error_message(body: &str) -> String {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| json.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| body.to_string());

        message.chars().take(MAX_ERROR_CHARS).collect()
    }
}

#[async_trait]
impl ImageModel for HuggingFaceModel {
    async fn generate_image(
        &self,
        prompt: &str,
        parameters: &GenerationParameters,
    ) -> Result<ImageResponse, ImageError> {
        let url = self.endpoint();
        debug!(
            model_id = %self.model_id,
            url = %url,
            prompt_len = prompt.len(),
            parameters = ?parameters,
            "HuggingFaceModel generating image"
        );

        let body = serde_json::to_vec(&Self::request_body(prompt, parameters))
            .map_err(|e| ImageError::SerializationError(e.to_string()))?;

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "image/*, application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            error!(model_id = %self.model_id, error = %e, "Failed to send request to Hugging Face");
            self.transport_error(&e)
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                model_id = %self.model_id,
                status = %status,
                error = %error_text,
                "Hugging Face returned error status"
            );
            return Err(ImageError::HttpStatus {
                status: status.as_u16(),
                message: Self::error_message(&error_text),
            });
        }

        let body = response.bytes().await.map_err(|e| {
            error!(model_id = %self.model_id, error = %e, "Failed to read Hugging Face response body");
            self.transport_error(&e)
        })?;

        let bytes = extract_image(body)?;
        let content_type = ImageFormat::detect(&bytes)
            .map(|format| format.content_type().to_string())
            .or_else(|| content_type.filter(|ct| ct.starts_with("image/")));

        let mut image = ImageResponse::new(bytes).with_model_id(self.model_id.clone());
        if let Some(content_type) = content_type {
            image = image.with_content_type(content_type);
        }
        Ok(image)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn require_key(key: Option<String>) -> Result<String, ImageError> {
    key.filter(|k| !k.is_empty()).ok_or_else(|| {
        ImageError::UnsupportedModelProvider(format!("{} environment variable not set", API_KEY_ENV))
    })
}

// Hugging Face API request structure

#[derive(Debug, Serialize)]
struct HuggingFaceRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}
