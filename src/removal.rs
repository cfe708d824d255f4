//! Background removal collaborator.
//!
//! The engine only needs "bytes in, transparent cut-out bytes out". The HTTP
//! implementation posts the source image to a segmentation endpoint; tests
//! substitute their own [`BackgroundRemover`].

#[cfg(test)]
#[path = "removal_test.rs"]
mod removal_test;

use async_trait::async_trait;

use crate::assets::{AssetError, sniff_mime};
use crate::config::RemoverConfig;
use crate::error::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RemovalError {
    /// The source image could not be loaded.
    #[error("source image unavailable: {0}")]
    Source(#[from] AssetError),

    /// The HTTP request to the segmentation service failed.
    #[error("removal request failed: {0}")]
    Request(String),

    /// The segmentation service returned a non-success status.
    #[error("removal response error: status {status}")]
    Response { status: u16, body: String },

    /// The service answered with something that is not an image.
    #[error("removal result is not an image")]
    InvalidResult,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for RemovalError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Source(_) => "E_REMOVAL_SOURCE",
            Self::Request(_) => "E_REMOVAL_REQUEST",
            Self::Response { .. } => "E_REMOVAL_RESPONSE",
            Self::InvalidResult => "E_REMOVAL_INVALID_RESULT",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Source(e) => e.retryable(),
            Self::Request(_) | Self::Response { status: 429 | 500..=599, .. } => true,
            _ => false,
        }
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Produces a transparent-background version of an encoded image.
#[async_trait(?Send)]
pub trait BackgroundRemover {
    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, RemovalError>;
}

/// Accept a service result only if it decodes as a known image format.
pub fn validate_result(bytes: Vec<u8>) -> Result<Vec<u8>, RemovalError> {
    if bytes.is_empty() || sniff_mime(&bytes).is_none() {
        return Err(RemovalError::InvalidResult);
    }
    Ok(bytes)
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpBackgroundRemover {
    http: reqwest::Client,
    config: RemoverConfig,
}

impl HttpBackgroundRemover {
    pub fn new(config: RemoverConfig) -> Result<Self, RemovalError> {
        let http = build_client(config.timeout_secs)?;
        Ok(Self { http, config })
    }

    /// Endpoint with model and output format query parameters.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/remove-background?model={}&format={}",
            self.config.url,
            self.config.model.as_str(),
            self.config.output.as_str()
        )
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn build_client(timeout_secs: u64) -> Result<reqwest::Client, RemovalError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RemovalError::HttpClientBuild(e.to_string()))
}

// The browser fetch backend has no client-wide timeout.
#[cfg(target_arch = "wasm32")]
fn build_client(_timeout_secs: u64) -> Result<reqwest::Client, RemovalError> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| RemovalError::HttpClientBuild(e.to_string()))
}

#[async_trait(?Send)]
impl BackgroundRemover for HttpBackgroundRemover {
    async fn remove_background(&self, image: &[u8]) -> Result<Vec<u8>, RemovalError> {
        let mut request = self
            .http
            .post(self.endpoint())
            .header("content-type", sniff_mime(image).unwrap_or("application/octet-stream"))
            .header("accept", self.config.output.mime())
            .body(image.to_vec());
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemovalError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| RemovalError::Request(e.to_string()))?;
            return Err(RemovalError::Response { status, body });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemovalError::Request(e.to_string()))?;
        validate_result(bytes.to_vec())
    }
}
