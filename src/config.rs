//! Editor tunables and background-removal configuration.
//!
//! [`EditorConfig`] carries every threshold the engine applies, defaulting to
//! the values in [`crate::consts`]. [`RemoverConfig`] is parsed from
//! environment variables by the host that wires up background removal.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::consts::{
    CENTER_SNAP_THRESHOLD, DEFAULT_IMAGE_WIDTH, DEFAULT_TEXT_HEIGHT, DEFAULT_TEXT_WIDTH, DUPLICATE_OFFSET,
    FALLBACK_IMAGE_SIZE, GRID_SIZE, MIN_ELEMENT_SIZE, NUDGE_STEP, NUDGE_STEP_LARGE, ROTATION_SNAP_DEG,
    SNAP_BACK_INSET,
};
use crate::error::ErrorCode;

pub const DEFAULT_REMOVAL_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing config: env var {var} not set")]
    Missing { var: String },

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Parse(String),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "E_CONFIG_MISSING",
            Self::Parse(_) => "E_CONFIG_PARSE",
        }
    }
}

// =============================================================================
// EDITOR
// =============================================================================

/// Thresholds and defaults applied by the engine. All distances are in
/// design-area units.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    pub min_element_size: f64,
    pub grid_size: f64,
    pub center_snap_threshold: f64,
    pub rotation_snap_deg: f64,
    pub snap_back_inset: f64,
    pub default_image_width: f64,
    pub fallback_image_size: (u32, u32),
    pub default_text_size: (f64, f64),
    pub duplicate_offset: f64,
    pub nudge_step: f64,
    pub nudge_step_large: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_element_size: MIN_ELEMENT_SIZE,
            grid_size: GRID_SIZE,
            center_snap_threshold: CENTER_SNAP_THRESHOLD,
            rotation_snap_deg: ROTATION_SNAP_DEG,
            snap_back_inset: SNAP_BACK_INSET,
            default_image_width: DEFAULT_IMAGE_WIDTH,
            fallback_image_size: FALLBACK_IMAGE_SIZE,
            default_text_size: (DEFAULT_TEXT_WIDTH, DEFAULT_TEXT_HEIGHT),
            duplicate_offset: DUPLICATE_OFFSET,
            nudge_step: NUDGE_STEP,
            nudge_step_large: NUDGE_STEP_LARGE,
        }
    }
}

// =============================================================================
// BACKGROUND REMOVAL
// =============================================================================

/// Segmentation model size requested from the removal service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalModel {
    Small,
    #[default]
    Medium,
    Large,
}

impl RemovalModel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

/// Encoding of the returned cut-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Webp,
}

impl OutputFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoverConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: RemovalModel,
    pub output: OutputFormat,
    pub timeout_secs: u64,
}

impl RemoverConfig {
    /// Build removal config from environment variables.
    ///
    /// Required:
    /// - `BG_REMOVAL_URL`: segmentation endpoint
    ///
    /// Optional:
    /// - `BG_REMOVAL_API_KEY_ENV`: names the env var containing a bearer key
    /// - `BG_REMOVAL_MODEL`: `small`, `medium` (default) or `large`
    /// - `BG_REMOVAL_OUTPUT`: `png` (default) or `webp`
    /// - `BG_REMOVAL_TIMEOUT_SECS`: default 60
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Build removal config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup("BG_REMOVAL_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing { var: "BG_REMOVAL_URL".into() })?
            .trim_end_matches('/')
            .to_string();

        let api_key = match lookup("BG_REMOVAL_API_KEY_ENV") {
            Some(key_var) => Some(lookup(&key_var).ok_or(ConfigError::Missing { var: key_var })?),
            None => None,
        };

        let model = parse_model(lookup("BG_REMOVAL_MODEL").as_deref())?;
        let output = parse_output(lookup("BG_REMOVAL_OUTPUT").as_deref())?;
        let timeout_secs = env_parse(lookup("BG_REMOVAL_TIMEOUT_SECS"), DEFAULT_REMOVAL_TIMEOUT_SECS);

        Ok(Self { url, api_key, model, output, timeout_secs })
    }
}

fn env_parse<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    match raw.map(|v| v.trim().parse::<T>()) {
        Some(Ok(value)) => value,
        _ => default,
    }
}

fn parse_model(raw: Option<&str>) -> Result<RemovalModel, ConfigError> {
    match raw.unwrap_or("medium") {
        "small" => Ok(RemovalModel::Small),
        "medium" => Ok(RemovalModel::Medium),
        "large" => Ok(RemovalModel::Large),
        other => Err(ConfigError::Parse(format!("unknown BG_REMOVAL_MODEL: {other}"))),
    }
}

fn parse_output(raw: Option<&str>) -> Result<OutputFormat, ConfigError> {
    match raw.unwrap_or("png") {
        "png" => Ok(OutputFormat::Png),
        "webp" => Ok(OutputFormat::Webp),
        other => Err(ConfigError::Parse(format!(
            "unsupported BG_REMOVAL_OUTPUT '{other}' (expected 'png' or 'webp')"
        ))),
    }
}
