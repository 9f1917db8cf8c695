//! Prompt-to-image generation and editing with Gemini image models.
//!
//! The [`studio::Studio`] pipeline loads input images, builds the
//! `generateContent` request, extracts the returned image and saves it.
//! Two front ends sit on top: the `thumbkit` CLI and the `nanobanana`
//! MCP server ([`mcp::NanobananaServer`]).

pub mod config;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod mcp;
pub mod models;
pub mod prompts;
pub mod storage;
pub mod studio;
pub mod validation;

pub use config::{Config, GeminiConfig, OutputSurface, RetryConfig};
pub use error::{Result, ThumbkitError};
pub use gemini::{ContentApi, HttpContentApi, ImageClient};
pub use models::*;
pub use storage::ImageStore;
pub use studio::{ImageJob, Studio};
