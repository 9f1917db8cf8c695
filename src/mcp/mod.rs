//! MCP tool server exposing `generate_image` and `edit_image`.

use crate::{
    config::{Config, OutputSurface},
    gemini::ImageClient,
    models::{GenerationOptions, ModelChoice, SavedImage},
    prompts,
    storage::ImageStore,
    studio::{ImageJob, Studio},
    validation::{validate_image_path, validate_reference_images},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GenerateImageRequest {
    #[schemars(description = "Text description of the desired image.")]
    pub prompt: String,
    #[schemars(
        description = "Optional absolute paths of images used as style/composition references. \
                       They are sent before the prompt. 1-3 work best. PNG/JPEG/WebP."
    )]
    pub reference_image_paths: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EditImageRequest {
    #[schemars(description = "Edit instructions in natural language.")]
    pub prompt: String,
    #[schemars(
        description = "Absolute path of the primary image to edit. The model preserves and transforms it."
    )]
    pub base_image_path: String,
    #[schemars(
        description = "Optional absolute paths of additional images (1-3 recommended) that steer style, \
                       palette, lighting or composition. Order can influence emphasis."
    )]
    pub reference_image_paths: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct NanobananaServer {
    config: Config,
    client: Option<ImageClient>,
    tool_router: ToolRouter<Self>,
}

impl NanobananaServer {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: None,
            tool_router: Self::tool_router(),
        }
    }

    /// Use a prepared client instead of building one from the config per call.
    pub fn with_client(mut self, client: ImageClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    fn studio(&self) -> crate::Result<Studio> {
        match &self.client {
            Some(client) => Ok(Studio::new(
                client.clone(),
                ImageStore::new(&self.config.output_dir),
                OutputSurface::Server,
            )),
            None => Studio::from_config(&self.config),
        }
    }

    fn options() -> GenerationOptions {
        GenerationOptions::new()
            .with_model(ModelChoice::Pro)
            .with_system_instruction(prompts::default_system_prompt())
    }

    async fn execute(&self, job: &ImageJob) -> crate::Result<SavedImage> {
        if let Some(base) = &job.base_image_path {
            validate_image_path(base, "base_image_path")?;
        }
        validate_reference_images(&job.reference_image_paths, "reference_image_paths")?;
        self.studio()?.run(job).await
    }

    async fn run_job(&self, job: ImageJob) -> CallToolResult {
        log::info!("🛠️  {:?} request: {}", job.mode(), job.prompt);

        match self.execute(&job).await {
            Ok(saved) => tool_success(&saved),
            Err(e) => {
                log::error!("Tool call failed: {}", e);
                CallToolResult::error(vec![Content::text(e.to_string())])
            }
        }
    }
}

fn to_paths(paths: Option<Vec<String>>) -> Vec<PathBuf> {
    paths.unwrap_or_default().into_iter().map(PathBuf::from).collect()
}

fn tool_success(saved: &SavedImage) -> CallToolResult {
    let mut result = CallToolResult::success(vec![
        Content::image(STANDARD.encode(&saved.image), "image/png"),
        Content::text(format!("Saved to {}", saved.file_path.display())),
    ]);
    result.structured_content = serde_json::to_value(saved).ok();
    result
}

#[tool_router]
impl NanobananaServer {
    #[tool(
        description = "Generate a 16:9 image from a text prompt using Gemini's image model. \
                       Reference images, when given, guide style, palette and layout without \
                       being preserved as a base."
    )]
    async fn generate_image(
        &self,
        Parameters(req): Parameters<GenerateImageRequest>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let job = ImageJob::generate(req.prompt)
            .with_references(to_paths(req.reference_image_paths))
            .with_options(Self::options());
        Ok(self.run_job(job).await)
    }

    #[tool(
        description = "Edit an image: the base image is preserved and transformed according to the \
                       prompt, optional references steer the style. For guided generation without \
                       a base, prefer generate_image."
    )]
    async fn edit_image(
        &self,
        Parameters(req): Parameters<EditImageRequest>,
    ) -> std::result::Result<CallToolResult, McpError> {
        let job = ImageJob::edit(req.prompt, req.base_image_path)
            .with_references(to_paths(req.reference_image_paths))
            .with_options(Self::options());
        Ok(self.run_job(job).await)
    }
}

#[tool_handler]
impl ServerHandler for NanobananaServer {
    fn get_info(&self) -> ServerInfo {
        let models = ModelChoice::supported_models()
            .into_iter()
            .map(|(short, id, _)| format!("{short}={id}"))
            .collect::<Vec<_>>()
            .join(", ");

        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nanobanana".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(format!(
                "Image generation and editing with Gemini ({models}). Images are saved under {} \
                 and returned inline. All image paths must be absolute.",
                self.config.output_dir.display()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gemini::ContentApi,
        models::gemini::{GenerateContentRequest, GenerateContentResponse},
    };
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct FixedApi(Value);

    #[async_trait]
    impl ContentApi for FixedApi {
        async fn generate_content(
            &self,
            _model: &str,
            _request: &GenerateContentRequest,
        ) -> crate::Result<GenerateContentResponse> {
            Ok(serde_json::from_value(self.0.clone()).unwrap())
        }
    }

    fn server(dir: &Path, response: Value) -> NanobananaServer {
        let config = Config::new(OutputSurface::Server).with_output_dir(dir);
        NanobananaServer::new(config)
            .with_client(ImageClient::with_api(Arc::new(FixedApi(response))))
    }

    fn first_text(result: &CallToolResult) -> String {
        let value = serde_json::to_value(&result.content[0]).unwrap();
        value["text"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn generate_returns_image_and_metadata() {
        let out = tempfile::tempdir().unwrap();
        let server = server(
            out.path(),
            json!({ "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": STANDARD.encode(b"png!") } }
            ]}}]}),
        );

        let job = ImageJob::generate("a red circle").with_options(NanobananaServer::options());
        let result = server.run_job(job).await;

        assert_ne!(result.is_error, Some(true));
        let image = serde_json::to_value(&result.content[0]).unwrap();
        assert_eq!(image["type"], "image");
        assert_eq!(image["mimeType"], "image/png");
        assert_eq!(image["data"], STANDARD.encode(b"png!"));

        let meta = result.structured_content.clone().unwrap();
        assert_eq!(meta["bytes"], 4);
        assert_eq!(meta["aspect_ratio"], "16:9");
        assert_eq!(meta["image_size"], "1K");
        assert_eq!(meta["reference_image_paths"], json!([]));
        let file_path = meta["file_path"].as_str().unwrap();
        assert!(file_path.contains("nanobanana-"));
        assert!(Path::new(file_path).is_file());
    }

    #[tokio::test]
    async fn relative_base_is_a_failed_invocation() {
        let out = tempfile::tempdir().unwrap();
        let server = server(out.path(), json!({}));

        let result = server.run_job(ImageJob::edit("x", "relative/base.png")).await;

        assert_eq!(result.is_error, Some(true));
        assert!(first_text(&result).contains("base_image_path must be an ABSOLUTE path"));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn blocked_prompt_is_a_failed_invocation() {
        let out = tempfile::tempdir().unwrap();
        let server = server(out.path(), json!({ "candidates": [] }));

        let result = server.run_job(ImageJob::generate("x")).await;

        assert_eq!(result.is_error, Some(true));
        assert!(first_text(&result).contains("no candidates"));
        assert!(result.structured_content.is_none());
    }

    #[tokio::test]
    async fn missing_api_key_surfaces_per_call() {
        let out = tempfile::tempdir().unwrap();
        let server = NanobananaServer::new(
            Config::new(OutputSurface::Server).with_output_dir(out.path()),
        );

        let result = server.run_job(ImageJob::generate("x")).await;

        assert_eq!(result.is_error, Some(true));
        assert!(first_text(&result).contains("GEMINI_API_KEY"));
    }

    #[test]
    fn both_tools_are_routed() {
        let server = NanobananaServer::new(Config::new(OutputSurface::Server));
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["edit_image", "generate_image"]);
    }

    #[test]
    fn server_info_names_the_server() {
        let server = NanobananaServer::new(Config::new(OutputSurface::Server));
        let info = server.get_info();
        assert_eq!(info.server_info.name, "nanobanana");
        assert!(info.instructions.unwrap().contains("gemini-3-pro-image-preview"));
    }
}
