use crate::error::{Result, ThumbkitError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const MODEL_FLASH: &str = "gemini-2.5-flash-image";
pub const MODEL_PRO: &str = "gemini-3-pro-image-preview";

pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

/// Image model selectable by shorthand. Pro is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    Flash,
    #[default]
    Pro,
}

impl ModelChoice {
    /// Resolve a shorthand (`flash`/`pro`) or a full model identifier.
    pub fn resolve(token: &str) -> Result<Self> {
        match token {
            "flash" | MODEL_FLASH => Ok(ModelChoice::Flash),
            "pro" | MODEL_PRO => Ok(ModelChoice::Pro),
            other => Err(ThumbkitError::UnknownModel(other.to_string())),
        }
    }

    pub fn shorthand(&self) -> &'static str {
        match self {
            ModelChoice::Flash => "flash",
            ModelChoice::Pro => "pro",
        }
    }

    pub fn model_id(&self) -> &'static str {
        match self {
            ModelChoice::Flash => MODEL_FLASH,
            ModelChoice::Pro => MODEL_PRO,
        }
    }

    pub fn supports_image_size(&self) -> bool {
        matches!(self, ModelChoice::Pro)
    }

    pub fn supported_models() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("flash", MODEL_FLASH, "Gemini 2.5 Flash Image"),
            ("pro", MODEL_PRO, "Gemini 3 Pro Image"),
        ]
    }
}

impl FromStr for ModelChoice {
    type Err = ThumbkitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::resolve(s)
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.shorthand())
    }
}

/// Output resolution for models that accept one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

impl FromStr for ImageSize {
    type Err = ThumbkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1K" => Ok(ImageSize::OneK),
            "2K" => Ok(ImageSize::TwoK),
            "4K" => Ok(ImageSize::FourK),
            other => Err(ThumbkitError::ValidationError(format!(
                "invalid size '{}': expected one of 1K, 2K, 4K",
                other
            ))),
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// MIME type from the file extension alone. Unknown extensions are treated as PNG.
pub fn guess_mime(path: impl AsRef<Path>) -> &'static str {
    let extension = path
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}
