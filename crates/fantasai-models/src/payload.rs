//! Validation of provider response bodies.
//!
//! Inference APIs answer with raw image bytes on success, but several of them
//! answer 2xx with a JSON error document (cold model, bad input) or wrap the
//! image as base64 inside JSON. Everything here turns a body into either
//! usable image bytes or an `ImageError`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use fantasai_abstraction::ImageError;
use serde_json::Value;

/// Bodies at or below this size are never real images.
pub const MIN_IMAGE_BYTES: usize = 100;

/// Top-level keys that may carry a base64 image.
const BASE64_KEYS: [&str; 4] = ["image", "b64_json", "base64", "photo"];

/// Normalizes a raw provider body into image bytes.
///
/// Non-JSON bodies are treated as binary image data and returned unchanged;
/// size checks are left to [`validate_image`].
///
/// # Errors
/// Returns `ProviderError` for JSON bodies carrying an `error` field,
/// `InvalidPayload` for JSON without a decodable image.
pub fn extract_image(body: Bytes) -> Result<Bytes, ImageError> {
    let Ok(json) = serde_json::from_slice::<Value>(&body) else {
        return Ok(body);
    };

    if let Some(message) = error_message(&json) {
        return Err(ImageError::ProviderError(message));
    }

    let encoded = find_base64(&json).ok_or_else(|| {
        ImageError::InvalidPayload("JSON response did not contain image data".to_string())
    })?;

    let encoded = strip_data_url(encoded);
    STANDARD
        .decode(encoded.trim())
        .map(Bytes::from)
        .map_err(|e| ImageError::InvalidPayload(format!("Invalid base64 image data: {}", e)))
}

/// Checks that `bytes` look like an image rather than an error.
///
/// # Errors
/// Returns `ProviderError` when the bytes are a JSON object with an `error`
/// field, `InvalidPayload` when they are not larger than [`MIN_IMAGE_BYTES`].
pub fn validate_image(bytes: &[u8]) -> Result<(), ImageError> {
    if let Ok(json) = serde_json::from_slice::<Value>(bytes) {
        if let Some(message) = error_message(&json) {
            return Err(ImageError::ProviderError(message));
        }
    }

    if bytes.len() <= MIN_IMAGE_BYTES {
        return Err(ImageError::InvalidPayload(format!(
            "Invalid image data received ({} bytes)",
            bytes.len()
        )));
    }

    Ok(())
}

/// Message of a truthy `error` field; `null`, `false`, `0` and `""` do not count.
fn error_message(json: &Value) -> Option<String> {
    let error = json.as_object()?.get("error")?;
    let truthy = match error {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(message) => !message.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    };
    if !truthy {
        return None;
    }

    Some(match error {
        Value::String(message) => message.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string),
        other => other.to_string(),
    })
}

fn find_base64(json: &Value) -> Option<&str> {
    if let Some(object) = json.as_object() {
        for key in BASE64_KEYS {
            if let Some(encoded) = object.get(key).and_then(Value::as_str) {
                return Some(encoded);
            }
        }
    }

    json.pointer("/images/0")
        .and_then(|image| image.as_str().or_else(|| image.get("base64").and_then(Value::as_str)))
        .or_else(|| json.pointer("/data/0/b64_json").and_then(Value::as_str))
        .or_else(|| json.pointer("/artifacts/0/base64").and_then(Value::as_str))
        .or_else(|| json.pointer("/0/b64_json").and_then(Value::as_str))
}

fn strip_data_url(encoded: &str) -> &str {
    match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    }
}

/// Image container formats recognised by their magic numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Portable Network Graphics.
    Png,
    /// JPEG / JFIF.
    Jpeg,
    /// Graphics Interchange Format.
    Gif,
    /// WebP (RIFF container).
    Webp,
}

impl ImageFormat {
    /// Sniffs the format from the leading bytes.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }

    /// MIME type.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// Conventional file extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}
