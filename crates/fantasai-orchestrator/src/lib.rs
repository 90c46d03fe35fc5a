//! Image generation orchestration for Fantasai.
//!
//! An [`ImageOrchestrator`] owns a prioritized list of image models, a
//! per-model health registry and a prompt cache. [`ImageOrchestrator::generate`]
//! answers from cache when it can, otherwise walks the usable models in
//! priority order and returns the first valid image.
//!
//! ```no_run
//! # async fn demo() -> fantasai_orchestrator::Result<()> {
//! use fantasai_orchestrator::OrchestratorConfig;
//!
//! let orchestrator = OrchestratorConfig::default().build_orchestrator()?;
//! let image = orchestrator.generate("a lighthouse at dusk").await?;
//! println!("{} bytes", image.bytes.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod health;
pub mod orchestrator;
pub mod response;

pub use config::{ConfigError, HealthConfig, ModelSection, OrchestratorConfig, ProviderConfig};
pub use descriptor::{DEFAULT_NEGATIVE_PROMPT, ModelBinding, ModelDescriptor};
pub use error::{AttemptFailure, OrchestrationError, Result};
pub use health::{DEFAULT_VALIDITY_WINDOW, HealthRegistry, HealthSettings, ModelHealth};
pub use orchestrator::{GeneratedImage, ImageOrchestrator};
pub use response::{GenerateResponse, MAX_PROMPT_CHARS, error_response, validate_prompt};
