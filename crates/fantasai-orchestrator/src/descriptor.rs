//! Static description of each configured model.

use fantasai_abstraction::{GenerationParameters, ImageModel};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Negative prompt shared by the built-in Stable Diffusion entries.
pub const DEFAULT_NEGATIVE_PROMPT: &str = "blurry, bad quality, distorted, ugly, deformed";

/// An immutable model entry: what to call, in which order, with which options.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    /// Provider/model identifier.
    pub id: String,
    /// Lower is tried first.
    pub priority: i32,
    /// Provider-specific generation options.
    pub parameters: GenerationParameters,
    /// Upper bound for a single attempt.
    pub timeout: Duration,
}

impl ModelDescriptor {
    /// Creates a descriptor with no generation options.
    #[must_use]
    pub fn new(id: impl Into<String>, priority: i32, timeout: Duration) -> Self {
        Self { id: id.into(), priority, parameters: GenerationParameters::new(), timeout }
    }

    /// Sets the generation options.
    #[must_use]
    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// The three hosted Stable Diffusion checkpoints, fastest-to-load first.
    #[must_use]
    pub fn default_catalog() -> Vec<Self> {
        let sd = |steps: u32, guidance: f64| {
            GenerationParameters::new()
                .with("num_inference_steps", steps)
                .with("guidance_scale", guidance)
                .with("negative_prompt", DEFAULT_NEGATIVE_PROMPT)
        };

        vec![
            Self::new("stabilityai/stable-diffusion-xl-base-1.0", 1, Duration::from_secs(40))
                .with_parameters(sd(30, 7.5)),
            Self::new("runwayml/stable-diffusion-v1-5", 2, Duration::from_secs(35))
                .with_parameters(sd(35, 8.0)),
            Self::new("CompVis/stable-diffusion-v1-4", 3, Duration::from_secs(30))
                .with_parameters(sd(25, 7.5)),
        ]
    }
}

/// A descriptor paired with the client that serves it.
#[derive(Clone)]
pub struct ModelBinding {
    /// What to call and how.
    pub descriptor: ModelDescriptor,
    /// The provider client.
    pub model: Arc<dyn ImageModel>,
}

impl ModelBinding {
    /// Pairs a descriptor with its client.
    #[must_use]
    pub fn new(descriptor: ModelDescriptor, model: Arc<dyn ImageModel>) -> Self {
        Self { descriptor, model }
    }
}

impl fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBinding")
            .field("descriptor", &self.descriptor)
            .field("model_id", &self.model.model_id())
            .finish()
    }
}
