//! One call end to end: load input images, ask the model, save the result.

use crate::{
    config::{Config, OutputSurface},
    error::Result,
    gemini::ImageClient,
    models::{GenerationOptions, GenerationRequest, ImageBlob, RequestMode, SavedImage},
    storage::ImageStore,
};
use std::path::PathBuf;

/// Caller-level description of a generate or edit call, before any file is read.
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub prompt: String,
    pub base_image_path: Option<PathBuf>,
    pub reference_image_paths: Vec<PathBuf>,
    pub options: GenerationOptions,
}

impl ImageJob {
    pub fn generate(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            base_image_path: None,
            reference_image_paths: Vec::new(),
            options: GenerationOptions::default(),
        }
    }

    pub fn edit(prompt: impl Into<String>, base_image_path: impl Into<PathBuf>) -> Self {
        Self {
            base_image_path: Some(base_image_path.into()),
            ..Self::generate(prompt)
        }
    }

    pub fn with_references(mut self, paths: Vec<PathBuf>) -> Self {
        self.reference_image_paths = paths;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn mode(&self) -> RequestMode {
        if self.base_image_path.is_some() {
            RequestMode::Edit
        } else {
            RequestMode::Generate
        }
    }

    /// Read every input image and assemble the request.
    pub async fn load(&self) -> Result<GenerationRequest> {
        let mut references = Vec::with_capacity(self.reference_image_paths.len());
        for path in &self.reference_image_paths {
            references.push(ImageBlob::load(path).await?);
        }

        let request = match &self.base_image_path {
            Some(base) => GenerationRequest::edit(&self.prompt, ImageBlob::load(base).await?),
            None => GenerationRequest::generate(&self.prompt),
        };

        Ok(request
            .with_references(references)
            .with_options(self.options.clone()))
    }
}

pub struct Studio {
    client: ImageClient,
    store: ImageStore,
    surface: OutputSurface,
}

impl Studio {
    pub fn new(client: ImageClient, store: ImageStore, surface: OutputSurface) -> Self {
        Self {
            client,
            store,
            surface,
        }
    }

    /// Studio writing to the configured output directory over HTTP.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            ImageClient::new(&config.gemini)?,
            ImageStore::new(&config.output_dir),
            config.surface,
        ))
    }

    /// Nothing is written unless the model returned an image.
    pub async fn run(&self, job: &ImageJob) -> Result<SavedImage> {
        let request = job.load().await?;
        let result = self.client.generate(&request).await?;

        let prefix = self.surface.file_prefix(job.mode());
        let file_path = self.store.save(&result.image, prefix).await?;

        Ok(SavedImage {
            file_path,
            bytes: result.image.len(),
            metadata: result.metadata,
            image: result.image,
        })
    }
}
