pub mod image_client;

use crate::{
    config::{GeminiConfig, RetryConfig},
    error::{Result, ThumbkitError},
    models::gemini::{ErrorResponse, GenerateContentRequest, GenerateContentResponse},
};
use async_trait::async_trait;
use reqwest::StatusCode;

pub use image_client::{safety_settings, ImageClient};

/// Statuses worth another attempt.
const TRANSIENT_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// One `generateContent` round trip. The HTTP implementation is the only
/// production one; tests substitute canned responses.
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

pub struct HttpContentApi {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    retry: RetryConfig,
}

impl HttpContentApi {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config.api_key()?.to_string();
        let http = reqwest::Client::builder()
            .user_agent(concat!("thumbkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ThumbkitError::ConfigError(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model);
        let body = serde_json::to_vec(request)
            .map_err(|e| ThumbkitError::SerializationError(e.to_string()))?;
        let mut attempt = 1;

        loop {
            log::debug!("POST {} (attempt {}/{})", url, attempt, self.retry.max_attempts);

            let response = self
                .http
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.clone())
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<GenerateContentResponse>()
                    .await
                    .map_err(|e| ThumbkitError::ResponseError(e.to_string()));
            }

            if TRANSIENT_STATUSES.contains(&status.as_u16()) && attempt < self.retry.max_attempts {
                let delay = self.retry.backoff(attempt);
                log::warn!(
                    "Gemini returned {}, retrying in {}ms",
                    status,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, &text));
        }
    }
}

fn api_error(status: StatusCode, body: &str) -> ThumbkitError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| match e.error.status {
            Some(code) => format!("{} ({})", e.error.message, code),
            None => e.error.message,
        })
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });

    ThumbkitError::ApiError {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GenerationRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const UNAVAILABLE: &str =
        r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#;
    const BAD_REQUEST: &str =
        r#"{"error":{"code":400,"message":"Invalid aspect ratio.","status":"INVALID_ARGUMENT"}}"#;

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    return;
                }
            }
        }
    }

    /// Serves the scripted responses in order, repeating the last one.
    async fn scripted_server(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                read_request(&mut socket).await;
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[n.min(responses.len() - 1)];
                let reply = format!(
                    "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn api(base_url: &str, retry: RetryConfig) -> HttpContentApi {
        let config = GeminiConfig::new()
            .with_api_key("test-key")
            .with_base_url(base_url)
            .with_retry(retry);
        HttpContentApi::new(&config).unwrap()
    }

    fn quick_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        }
    }

    fn body() -> GenerateContentRequest {
        ImageClient::build_request(&GenerationRequest::generate("a red circle"))
    }

    #[tokio::test]
    async fn transient_status_is_retried_until_success() {
        let (base_url, hits) =
            scripted_server(vec![(503, UNAVAILABLE), (200, r#"{"candidates":[]}"#)]).await;

        let response = api(&base_url, quick_retry(3))
            .generate_content("gemini-3-pro-image-preview", &body())
            .await
            .unwrap();

        assert!(response.candidates.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retries_stop_after_max_attempts() {
        let (base_url, hits) = scripted_server(vec![(503, UNAVAILABLE)]).await;

        let err = api(&base_url, quick_retry(3))
            .generate_content("gemini-3-pro-image-preview", &body())
            .await
            .unwrap_err();

        match err {
            ThumbkitError::ApiError { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "The model is overloaded. (UNAVAILABLE)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (base_url, hits) = scripted_server(vec![(400, BAD_REQUEST)]).await;

        let err = api(&base_url, quick_retry(3))
            .generate_content("gemini-2.5-flash-image", &body())
            .await
            .unwrap_err();

        assert!(matches!(err, ThumbkitError::ApiError { status: 400, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_retry_makes_one_attempt() {
        let (base_url, hits) = scripted_server(vec![(503, UNAVAILABLE)]).await;

        let err = api(&base_url, RetryConfig::disabled())
            .generate_content("gemini-3-pro-image-preview", &body())
            .await
            .unwrap_err();

        assert!(matches!(err, ThumbkitError::ApiError { status: 503, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn endpoint_targets_the_model() {
        let config = GeminiConfig::new()
            .with_api_key("k")
            .with_base_url("https://example.test/v1beta/");
        let api = HttpContentApi::new(&config).unwrap();
        assert_eq!(
            api.endpoint("gemini-3-pro-image-preview"),
            "https://example.test/v1beta/models/gemini-3-pro-image-preview:generateContent"
        );
    }

    #[test]
    fn http_api_requires_a_key() {
        assert!(matches!(
            HttpContentApi::new(&GeminiConfig::new()),
            Err(ThumbkitError::ConfigError(_))
        ));
    }

    #[test]
    fn google_error_body_is_unwrapped() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        match api_error(StatusCode::BAD_REQUEST, body) {
            ThumbkitError::ApiError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid. (INVALID_ARGUMENT)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_error_body_uses_reason_phrase() {
        match api_error(StatusCode::SERVICE_UNAVAILABLE, "") {
            ThumbkitError::ApiError { message, .. } => assert_eq!(message, "Service Unavailable"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
