//! Image model implementations for Fantasai.
//!
//! This crate provides concrete implementations of the `ImageModel` trait,
//! payload validation shared by every provider, and the prompt cache.
//!
//! # Supported Providers
//!
//! - **Mock**: Testing and offline development
//! - **Hugging Face**: Hosted inference API (API key required)

pub mod cache;
pub mod factory;
pub mod huggingface;
pub mod payload;

use async_trait::async_trait;
use bytes::Bytes;
use fantasai_abstraction::{GenerationParameters, ImageError, ImageModel, ImageResponse};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

pub use cache::{CacheConfig, CacheConfigError, CacheStats, PromptCache};
pub use factory::{ModelConfig, ModelFactory, ModelType};
pub use huggingface::HuggingFaceModel;
pub use payload::{ImageFormat, MIN_IMAGE_BYTES, extract_image, validate_image};

/// What a [`MockImageModel`] answers with.
#[derive(Debug, Clone)]
enum MockBehavior {
    /// Synthesize a PNG-signed payload derived from the prompt.
    Synthesize,
    /// Return these exact bytes.
    Respond(Bytes),
    /// Fail with this error.
    Fail(ImageError),
}

/// A mock implementation of the `ImageModel` trait for testing and offline use.
#[derive(Debug)]
pub struct MockImageModel {
    id: String,
    behavior: MockBehavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockImageModel {
    /// Creates a mock that synthesizes a deterministic image for every prompt.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), behavior: MockBehavior::Synthesize, delay: None, calls: AtomicUsize::new(0) }
    }

    /// Creates a mock that always returns `bytes`, whatever they are.
    #[must_use]
    pub fn returning(id: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self { behavior: MockBehavior::Respond(bytes.into()), ..Self::new(id) }
    }

    /// Creates a mock that always fails with `error`.
    #[must_use]
    pub fn failing(id: impl Into<String>, error: ImageError) -> Self {
        Self { behavior: MockBehavior::Fail(error), ..Self::new(id) }
    }

    /// Sleeps for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `generate_image` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The payload produced in synthesize mode: a PNG signature followed by
    /// the prompt, padded past the minimum image size.
    #[must_use]
    pub fn synthesize(prompt: &str) -> Bytes {
        const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(prompt.as_bytes());
        let target = (MIN_IMAGE_BYTES + 1).max(256);
        if data.len() < target {
            data.resize(target, 0);
        }
        Bytes::from(data)
    }
}

#[async_trait]
impl ImageModel for MockImageModel {
    async fn generate_image(
        &self,
        prompt: &str,
        parameters: &GenerationParameters,
    ) -> Result<ImageResponse, ImageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(
            model_id = %self.id,
            prompt_len = prompt.len(),
            parameters = parameters.len(),
            "MockImageModel generating image"
        );

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let bytes = match &self.behavior {
            MockBehavior::Synthesize => Self::synthesize(prompt),
            MockBehavior::Respond(bytes) => bytes.clone(),
            MockBehavior::Fail(error) => return Err(error.clone()),
        };

        Ok(ImageResponse::new(bytes).with_model_id(self.id.clone()))
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}
