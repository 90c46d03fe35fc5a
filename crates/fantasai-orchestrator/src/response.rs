//! Prompt validation and the JSON envelope returned to callers.

use fantasai_abstraction::ErrorClass;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::OrchestrationError;
use crate::orchestrator::{GeneratedImage, ImageOrchestrator};

/// Longest accepted prompt, in characters.
pub const MAX_PROMPT_CHARS: usize = 500;

/// Rejects prompts the orchestrator should never see.
///
/// # Errors
/// `InvalidPrompt` for an empty prompt or one longer than
/// [`MAX_PROMPT_CHARS`] characters.
pub fn validate_prompt(prompt: &str) -> Result<(), OrchestrationError> {
    if prompt.is_empty() {
        return Err(OrchestrationError::InvalidPrompt("Prompt is required".to_string()));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(OrchestrationError::InvalidPrompt(format!(
            "Invalid prompt. Must be a string under {} characters.",
            MAX_PROMPT_CHARS
        )));
    }
    Ok(())
}

/// `{ success, photo?, error? }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    /// Base64 image data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerateResponse {
    /// A successful response carrying `image`.
    #[must_use]
    pub fn from_image(image: &GeneratedImage) -> Self {
        use base64::Engine as _;
        Self {
            success: true,
            photo: Some(base64::engine::general_purpose::STANDARD.encode(&image.bytes)),
            error: None,
        }
    }

    /// A failed response with `message`.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, photo: None, error: Some(message.into()) }
    }
}

/// HTTP status and user-facing envelope for a failed generation.
#[must_use]
pub fn error_response(err: &OrchestrationError) -> (u16, GenerateResponse) {
    if let OrchestrationError::InvalidPrompt(message) = err {
        return (400, GenerateResponse::failure(message.clone()));
    }

    match err.class() {
        ErrorClass::Authentication => {
            (401, GenerateResponse::failure("Authentication failed. Please check your API key."))
        }
        ErrorClass::RateLimited => {
            (429, GenerateResponse::failure("Rate limit exceeded. Please try again later."))
        }
        ErrorClass::Unavailable => (
            503,
            GenerateResponse::failure("Service temporarily unavailable. Please try again later."),
        ),
        ErrorClass::Timeout | ErrorClass::InvalidPayload | ErrorClass::Other => (
            500,
            GenerateResponse::failure(format!("Image generation failed: {}", err)),
        ),
    }
}

impl ImageOrchestrator {
    /// Validates `prompt`, generates, and wraps the outcome in an envelope.
    pub async fn generate_response(&self, prompt: &str) -> (u16, GenerateResponse) {
        if let Err(err) = validate_prompt(prompt) {
            return error_response(&err);
        }

        match self.generate(prompt).await {
            Ok(image) => (200, GenerateResponse::from_image(&image)),
            Err(err) => {
                let (status, response) = error_response(&err);
                warn!(status, error = %err, "Image generation request failed");
                (status, response)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttemptFailure;
    use fantasai_abstraction::ImageError;

    fn exhausted(last: ImageError) -> OrchestrationError {
        OrchestrationError::Exhausted {
            failures: vec![
                AttemptFailure { model_id: "a".to_string(), error: ImageError::Timeout { timeout_ms: 10 } },
                AttemptFailure { model_id: "b".to_string(), error: last },
            ],
        }
    }

    fn http(status: u16) -> ImageError {
        ImageError::HttpStatus { status, message: "x".to_string() }
    }

    #[test]
    fn test_validate_prompt() {
        assert!(validate_prompt("a cat").is_ok());
        assert_eq!(validate_prompt("").unwrap_err().to_string(), "Prompt is required");
        assert!(validate_prompt(&"é".repeat(MAX_PROMPT_CHARS)).is_ok());
        assert_eq!(
            validate_prompt(&"x".repeat(MAX_PROMPT_CHARS + 1)).unwrap_err().to_string(),
            "Invalid prompt. Must be a string under 500 characters."
        );
    }

    #[test]
    fn test_status_mapping_follows_last_attempt() {
        let (status, body) = error_response(&exhausted(http(401)));
        assert_eq!(status, 401);
        assert_eq!(body.error.as_deref(), Some("Authentication failed. Please check your API key."));

        let (status, body) = error_response(&exhausted(http(429)));
        assert_eq!(status, 429);
        assert_eq!(body.error.as_deref(), Some("Rate limit exceeded. Please try again later."));

        let (status, body) = error_response(&exhausted(http(503)));
        assert_eq!(status, 503);
        assert_eq!(body.error.as_deref(), Some("Service temporarily unavailable. Please try again later."));

        let (status, body) = error_response(&exhausted(http(500)));
        assert_eq!(status, 500);
        assert_eq!(
            body.error.as_deref(),
            Some("Image generation failed: All models failed to generate image. Please try again later.")
        );
        assert!(!body.success);
        assert!(body.photo.is_none());
    }

    #[test]
    fn test_no_healthy_models_is_unavailable() {
        let (status, _) = error_response(&OrchestrationError::NoHealthyModels { configured: 3 });
        assert_eq!(status, 503);
    }

    #[test]
    fn test_invalid_prompt_is_bad_request() {
        let (status, body) = error_response(&OrchestrationError::InvalidPrompt("Prompt is required".to_string()));
        assert_eq!(status, 400);
        assert_eq!(body, GenerateResponse::failure("Prompt is required"));
    }

    #[test]
    fn test_envelope_serialization_omits_absent_fields() {
        let json = serde_json::to_value(GenerateResponse::failure("nope")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "error": "nope" }));
    }
}
