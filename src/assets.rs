//! Image sources: loading element content into bytes and describing it.
//!
//! Image content is either a `data:` URI (uploads, crop and background
//! removal results) or a URL. [`ImageLoader`] turns either into encoded
//! bytes; [`probe_dimensions`] reads the natural size without a full decode.

#[cfg(test)]
#[path = "assets_test.rs"]
mod assets_test;

use std::io::Cursor;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};

use crate::error::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced while loading or inspecting image content.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// The content is not a well-formed `data:` URI.
    #[error("malformed data URI")]
    MalformedDataUri,

    /// The base64 payload of a data URI could not be decoded.
    #[error("data URI payload decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The HTTP request for an image URL failed.
    #[error("image request failed: {0}")]
    Request(String),

    /// The image server returned a non-success status.
    #[error("image response error: status {status}")]
    Response { status: u16 },

    /// The bytes are not an image format we can read.
    #[error("unrecognized image data: {0}")]
    Format(String),

    /// This loader cannot fetch the given content.
    #[error("unsupported image source: {0}")]
    Unsupported(String),
}

impl ErrorCode for AssetError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedDataUri => "E_MALFORMED_DATA_URI",
            Self::Base64(_) => "E_DATA_URI_DECODE",
            Self::Request(_) => "E_IMAGE_REQUEST",
            Self::Response { .. } => "E_IMAGE_RESPONSE",
            Self::Format(_) => "E_IMAGE_FORMAT",
            Self::Unsupported(_) => "E_UNSUPPORTED_SOURCE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 429 | 500..=599 })
    }
}

// =============================================================================
// DATA URIS
// =============================================================================

/// Wrap encoded image bytes in a base64 `data:` URI.
#[must_use]
pub fn encode_data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", general_purpose::STANDARD.encode(bytes))
}

/// Extract the payload of a `data:` URI. Non-base64 payloads are returned as-is.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, AssetError> {
    let rest = uri.strip_prefix("data:").ok_or(AssetError::MalformedDataUri)?;
    let (meta, payload) = rest.split_once(',').ok_or(AssetError::MalformedDataUri)?;
    if meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        Ok(general_purpose::STANDARD.decode(payload.trim())?)
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

#[must_use]
pub fn is_data_uri(content: &str) -> bool {
    content.starts_with("data:")
}

/// MIME type for encoded image bytes, if recognized.
#[must_use]
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes) {
        Ok(format) => Some(format.to_mime_type()),
        Err(_) => None,
    }
}

/// Natural pixel size of encoded image bytes, read from the header.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), AssetError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AssetError::Format(e.to_string()))?;
    reader.into_dimensions().map_err(|e| AssetError::Format(e.to_string()))
}

// =============================================================================
// LOADERS
// =============================================================================

/// Resolves element content to encoded image bytes.
#[async_trait(?Send)]
pub trait ImageLoader {
    async fn load(&self, content: &str) -> Result<Vec<u8>, AssetError>;
}

/// Loads only inline `data:` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUriLoader;

#[async_trait(?Send)]
impl ImageLoader for DataUriLoader {
    async fn load(&self, content: &str) -> Result<Vec<u8>, AssetError> {
        if !is_data_uri(content) {
            return Err(AssetError::Unsupported(content.chars().take(64).collect()));
        }
        decode_data_uri(content)
    }
}

/// Fetches image URLs over HTTP and decodes inline data URIs locally.
#[derive(Debug, Clone, Default)]
pub struct HttpImageLoader {
    http: reqwest::Client,
}

impl HttpImageLoader {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait(?Send)]
impl ImageLoader for HttpImageLoader {
    async fn load(&self, content: &str) -> Result<Vec<u8>, AssetError> {
        if is_data_uri(content) {
            return decode_data_uri(content);
        }

        let response = self
            .http
            .get(content)
            .send()
            .await
            .map_err(|e| AssetError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(AssetError::Response { status });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AssetError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
