use crate::models::common::{guess_mime, ImageSize, ModelChoice, DEFAULT_ASPECT_RATIO};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw image bytes sent to the model as an inline part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub source: Option<PathBuf>,
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

impl ImageBlob {
    pub fn new(mime_type: &'static str, data: Vec<u8>) -> Self {
        Self {
            source: None,
            mime_type,
            data,
        }
    }

    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        Ok(Self {
            source: Some(path.to_path_buf()),
            mime_type: guess_mime(path),
            data,
        })
    }

    fn source_display(&self) -> Option<String> {
        self.source.as_ref().map(|p| p.display().to_string())
    }
}

/// Per-call generation settings.
///
/// | field | applies to |
/// |---|---|
/// | `model` | always |
/// | `aspect_ratio` | always |
/// | `image_size` | Pro only, dropped for Flash |
/// | `system_instruction` | always, omitted when `None` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub model: ModelChoice,
    pub aspect_ratio: String,
    pub image_size: Option<ImageSize>,
    pub system_instruction: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: ModelChoice::default(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            image_size: Some(ImageSize::default()),
            system_instruction: None,
        }
    }
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: ModelChoice) -> Self {
        self.model = model;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }

    pub fn with_image_size(mut self, image_size: Option<ImageSize>) -> Self {
        self.image_size = image_size;
        self
    }

    pub fn with_system_instruction(mut self, system_instruction: Option<String>) -> Self {
        self.system_instruction = system_instruction.filter(|s| !s.trim().is_empty());
        self
    }

    /// The size actually sent upstream. A size requested for a model that
    /// does not take one is ignored rather than rejected.
    pub fn effective_image_size(&self) -> Option<ImageSize> {
        if self.model.supports_image_size() {
            self.image_size
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Generate,
    Edit,
}

/// Everything needed for one generateContent call. Built fresh per call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub base_image: Option<ImageBlob>,
    pub reference_images: Vec<ImageBlob>,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn generate(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            base_image: None,
            reference_images: Vec::new(),
            options: GenerationOptions::default(),
        }
    }

    pub fn edit(prompt: impl Into<String>, base_image: ImageBlob) -> Self {
        Self {
            base_image: Some(base_image),
            ..Self::generate(prompt)
        }
    }

    pub fn with_references(mut self, references: Vec<ImageBlob>) -> Self {
        self.reference_images = references;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn mode(&self) -> RequestMode {
        if self.base_image.is_some() {
            RequestMode::Edit
        } else {
            RequestMode::Generate
        }
    }

    /// Images in the order the model sees them: base first, then references
    /// in caller order. The prompt always follows these.
    pub fn ordered_images(&self) -> impl Iterator<Item = &ImageBlob> {
        self.base_image.iter().chain(self.reference_images.iter())
    }

    pub fn metadata(&self) -> GenerationMetadata {
        GenerationMetadata {
            model: self.options.model,
            model_name: self.options.model.model_id().to_string(),
            aspect_ratio: self.options.aspect_ratio.clone(),
            image_size: self.options.effective_image_size(),
            base_image_path: self.base_image.as_ref().and_then(ImageBlob::source_display),
            reference_image_paths: self
                .reference_images
                .iter()
                .filter_map(ImageBlob::source_display)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub model: ModelChoice,
    pub model_name: String,
    pub aspect_ratio: String,
    pub image_size: Option<ImageSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_image_path: Option<String>,
    #[serde(default)]
    pub reference_image_paths: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub image: Vec<u8>,
    pub metadata: GenerationMetadata,
}

/// A generated image after it has been written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct SavedImage {
    pub file_path: PathBuf,
    pub bytes: usize,
    #[serde(flatten)]
    pub metadata: GenerationMetadata,
    #[serde(skip)]
    pub image: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(path: &str) -> ImageBlob {
        ImageBlob {
            source: Some(PathBuf::from(path)),
            mime_type: guess_mime(path),
            data: path.as_bytes().to_vec(),
        }
    }

    #[test]
    fn generate_without_images_has_no_image_parts() {
        let request = GenerationRequest::generate("a red circle");
        assert_eq!(request.mode(), RequestMode::Generate);
        assert_eq!(request.ordered_images().count(), 0);
    }

    #[test]
    fn edit_puts_base_before_references() {
        let request = GenerationRequest::edit("make it blue", blob("/img/base.png"))
            .with_references(vec![blob("/img/r1.jpg"), blob("/img/r2.webp")]);
        let order: Vec<_> = request
            .ordered_images()
            .map(|b| b.source.clone().unwrap())
            .collect();
        assert_eq!(
            order,
            vec![
                PathBuf::from("/img/base.png"),
                PathBuf::from("/img/r1.jpg"),
                PathBuf::from("/img/r2.webp")
            ]
        );
        assert_eq!(request.mode(), RequestMode::Edit);
    }

    #[test]
    fn size_is_dropped_for_flash() {
        let options = GenerationOptions::new()
            .with_model(ModelChoice::Flash)
            .with_image_size(Some(ImageSize::FourK));
        assert_eq!(options.effective_image_size(), None);

        let options = options.with_model(ModelChoice::Pro);
        assert_eq!(options.effective_image_size(), Some(ImageSize::FourK));
    }

    #[test]
    fn blank_system_instruction_is_absent() {
        let options = GenerationOptions::new().with_system_instruction(Some("  \n".into()));
        assert!(options.system_instruction.is_none());
    }

    #[test]
    fn metadata_lists_input_paths() {
        let request = GenerationRequest::edit("x", blob("/img/base.png"))
            .with_references(vec![blob("/img/r1.jpg")])
            .with_options(GenerationOptions::new().with_aspect_ratio("1:1"));
        let metadata = request.metadata();
        assert_eq!(metadata.model_name, "gemini-3-pro-image-preview");
        assert_eq!(metadata.aspect_ratio, "1:1");
        assert_eq!(metadata.image_size, Some(ImageSize::OneK));
        assert_eq!(metadata.base_image_path.as_deref(), Some("/img/base.png"));
        assert_eq!(metadata.reference_image_paths, vec!["/img/r1.jpg".to_string()]);
    }

    #[test]
    fn saved_image_serializes_flat() {
        let saved = SavedImage {
            file_path: PathBuf::from("/out/thumbkit-1.png"),
            bytes: 3,
            metadata: GenerationRequest::generate("x").metadata(),
            image: vec![1, 2, 3],
        };
        let value = serde_json::to_value(&saved).unwrap();
        assert_eq!(value["file_path"], "/out/thumbkit-1.png");
        assert_eq!(value["bytes"], 3);
        assert_eq!(value["model"], "pro");
        assert_eq!(value["image_size"], "1K");
        assert_eq!(value["aspect_ratio"], "16:9");
        assert!(value.get("image").is_none());
        assert!(value.get("base_image_path").is_none());
    }
}
