// Error types for image generation orchestration

use fantasai_abstraction::{ErrorClass, ImageError};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// One failed provider attempt inside a `generate` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFailure {
    /// The model that was tried.
    pub model_id: String,
    /// Why it failed.
    pub error: ImageError,
}

/// Orchestration errors
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// Prompt missing or outside the accepted length
    #[error("{0}")]
    InvalidPrompt(String),

    /// Every configured model is unhealthy and inside its validity window
    #[error("No healthy models available ({configured} configured). Please try again later.")]
    NoHealthyModels {
        /// Number of configured models
        configured: usize,
    },

    /// Every candidate was attempted and failed
    #[error("All models failed to generate image. Please try again later.")]
    Exhausted {
        /// One entry per attempted model, in attempt order
        failures: Vec<AttemptFailure>,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Model construction error
    #[error("Model error: {0}")]
    Model(#[from] ImageError),
}

impl OrchestrationError {
    /// Failure class used to pick a user-facing status.
    ///
    /// For `Exhausted` this is the class of the last attempt, which is the
    /// closest thing to "the" reason the request failed.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoHealthyModels { .. } => ErrorClass::Unavailable,
            Self::Exhausted { failures } => {
                failures.last().map_or(ErrorClass::Other, |failure| failure.error.class())
            }
            Self::Model(err) => err.class(),
            Self::InvalidPrompt(_) | Self::Config(_) => ErrorClass::Other,
        }
    }

    /// The per-attempt failures, empty for non-exhaustion errors.
    #[must_use]
    pub fn failures(&self) -> &[AttemptFailure] {
        match self {
            Self::Exhausted { failures } => failures,
            _ => &[],
        }
    }
}
