use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThumbkitError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Unknown model: {0}. Use 'flash' or 'pro'.")]
    UnknownModel(String),
    #[error("Gemini returned no candidates. Prompt feedback: {0}")]
    NoCandidates(String),
    #[error("Gemini returned empty content. Finish reason: {finish_reason}, Safety ratings: {safety_ratings}")]
    EmptyContent {
        finish_reason: String,
        safety_ratings: String,
    },
    #[error("Gemini did not return image data in response parts.")]
    MissingImageData,
    #[error("Gemini API error {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ThumbkitError {
    /// Remediation text shown under the error message on the command line.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ThumbkitError::ConfigError(_) => Some(
                "SOLUTION: Set your Gemini API key in one of these ways:\n  \
                 1. Create a .env file in your current directory:\n     \
                 echo 'GEMINI_API_KEY=your-key-here' > .env\n  \
                 2. Export as environment variable:\n     \
                 export GEMINI_API_KEY='your-key-here'\n  \
                 3. Use GOOGLE_API_KEY instead (alternative name):\n     \
                 export GOOGLE_API_KEY='your-key-here'\n\n\
                 Get your API key at: https://ai.google.dev/",
            ),
            // validation messages already carry their own SOLUTION block
            ThumbkitError::ValidationError(_) => None,
            ThumbkitError::UnknownModel(_) => {
                Some("SOLUTION: Pass --model flash or --model pro.")
            }
            ThumbkitError::NoCandidates(_) | ThumbkitError::EmptyContent { .. } => Some(
                "POSSIBLE CAUSES:\n  \
                 - The prompt was blocked before generation\n  \
                 - The output was filtered after generation\n\n\
                 SOLUTIONS:\n  \
                 - Rephrase the prompt to be less specific about people or brands\n  \
                 - Try again without reference images",
            ),
            ThumbkitError::MissingImageData => Some(
                "POSSIBLE CAUSES:\n  \
                 1. The prompt may have triggered content safety filters\n  \
                 2. The API request may have failed\n  \
                 3. The reference images may be incompatible\n\n\
                 SOLUTIONS:\n  \
                 - Try rephrasing your prompt to be less specific about people/brands\n  \
                 - Verify your API key is valid and has quota remaining\n  \
                 - Try without reference images to isolate the issue\n  \
                 - Check if reference images are valid and not corrupted",
            ),
            ThumbkitError::IoError(err) => match err.kind() {
                std::io::ErrorKind::NotFound => Some(
                    "SOLUTION: Verify the file path is correct.\n\
                     Remember: All image paths must be ABSOLUTE paths (e.g., /Users/username/image.png)",
                ),
                std::io::ErrorKind::PermissionDenied => Some(
                    "SOLUTION: Check file permissions or try a different output directory.",
                ),
                _ => None,
            },
            ThumbkitError::ApiError { .. }
            | ThumbkitError::RequestError(_)
            | ThumbkitError::ResponseError(_)
            | ThumbkitError::SerializationError(_) => {
                Some("If this persists, check your API key and network connection.")
            }
        }
    }
}

impl From<reqwest::Error> for ThumbkitError {
    fn from(err: reqwest::Error) -> Self {
        ThumbkitError::RequestError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ThumbkitError>;
