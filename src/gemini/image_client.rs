use crate::{
    config::GeminiConfig,
    error::{Result, ThumbkitError},
    gemini::{ContentApi, HttpContentApi},
    logger,
    models::{
        gemini::{
            Content, DisplayRatings, GenerateContentRequest, GenerateContentResponse,
            GenerationConfig, ImageConfig, Part, SafetySetting,
        },
        GenerationRequest, GenerationResult,
    },
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

const HARM_CATEGORIES: [&str; 5] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_CIVIC_INTEGRITY",
];

/// Every harm category with filtering turned off.
pub fn safety_settings() -> Vec<SafetySetting> {
    HARM_CATEGORIES
        .iter()
        .map(|&category| SafetySetting {
            category,
            threshold: "OFF",
        })
        .collect()
}

#[derive(Clone)]
pub struct ImageClient {
    api: Arc<dyn ContentApi>,
}

impl ImageClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        Ok(Self::with_api(Arc::new(HttpContentApi::new(config)?)))
    }

    pub fn with_api(api: Arc<dyn ContentApi>) -> Self {
        Self { api }
    }

    /// Build the wire body. Images go first (base, then references in
    /// caller order) and the prompt is always the last part.
    pub fn build_request(request: &GenerationRequest) -> GenerateContentRequest {
        let mut parts: Vec<Part> = request
            .ordered_images()
            .map(|blob| Part::inline(blob.mime_type, STANDARD.encode(&blob.data)))
            .collect();
        parts.push(Part::text(request.prompt.clone()));

        let options = &request.options;
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            safety_settings: safety_settings(),
            system_instruction: options.system_instruction.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part::text(text.clone())],
            }),
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE"],
                image_config: ImageConfig {
                    aspect_ratio: options.aspect_ratio.clone(),
                    image_size: options.effective_image_size(),
                },
            },
        }
    }

    /// Pull the first inline image out of the first candidate.
    pub fn extract_image(response: GenerateContentResponse) -> Result<Vec<u8>> {
        let prompt_feedback = response.prompt_feedback;
        let candidate = match response.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                return Err(ThumbkitError::NoCandidates(
                    prompt_feedback.map_or_else(|| "None".to_string(), |f| f.to_string()),
                ))
            }
        };

        let parts = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default();
        if parts.is_empty() {
            let safety_ratings = if candidate.safety_ratings.is_empty() {
                "None".to_string()
            } else {
                DisplayRatings(&candidate.safety_ratings).to_string()
            };
            return Err(ThumbkitError::EmptyContent {
                finish_reason: candidate
                    .finish_reason
                    .unwrap_or_else(|| "unknown".to_string()),
                safety_ratings,
            });
        }

        let blob = parts
            .into_iter()
            .find_map(|part| part.inline_data)
            .ok_or(ThumbkitError::MissingImageData)?;

        log::debug!("Found inline {} part", blob.mime_type);
        STANDARD
            .decode(blob.data.as_bytes())
            .map_err(|e| ThumbkitError::ResponseError(format!("invalid base64 image data: {}", e)))
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let model_id = request.options.model.model_id();
        let body = Self::build_request(request);

        log::info!(
            "Generating image with model: {} ({} input image(s))",
            model_id,
            body.contents[0].parts.len() - 1
        );

        let response = {
            let _timer = logger::timer(&format!("generateContent {}", model_id));
            self.api.generate_content(model_id, &body).await?
        };
        let image = Self::extract_image(response)?;

        log::info!("Received {} bytes of image data", image.len());
        Ok(GenerationResult {
            image,
            metadata: request.metadata(),
        })
    }
}
