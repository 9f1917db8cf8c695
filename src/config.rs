use crate::error::{Result, ThumbkitError};
use crate::models::RequestMode;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Which front end is running. Decides the output directory variable,
/// its fallback, and the file name prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSurface {
    Cli,
    Server,
}

impl OutputSurface {
    pub fn output_dir_var(&self) -> &'static str {
        match self {
            OutputSurface::Cli => "THUMBKIT_OUTPUT_DIR",
            OutputSurface::Server => "NANOBANANA_OUTPUT_DIR",
        }
    }

    /// Fallback output directory, relative to the working directory.
    pub fn default_output_dir(&self) -> PathBuf {
        match self {
            OutputSurface::Cli => PathBuf::from("youtube").join("thumbnails"),
            OutputSurface::Server => PathBuf::from(".nanobanana-generations"),
        }
    }

    pub fn file_prefix(&self, mode: RequestMode) -> &'static str {
        match (self, mode) {
            (OutputSurface::Cli, RequestMode::Generate) => "thumbkit",
            (OutputSurface::Cli, RequestMode::Edit) => "thumbkit-edit",
            (OutputSurface::Server, RequestMode::Generate) => "nanobanana",
            (OutputSurface::Server, RequestMode::Edit) => "nanobanana-edit",
        }
    }
}

/// Retry policy for transient HTTP failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    pub fn disabled() -> Self {
        RetryConfig {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub retry: RetryConfig,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|&var| lookup(var))
            .find(|value| !value.trim().is_empty());
        let base_url = lookup("GEMINI_API_BASE_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        GeminiConfig {
            api_key,
            base_url,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            ThumbkitError::ConfigError(
                "Missing GEMINI_API_KEY (or GOOGLE_API_KEY) environment variable.".into(),
            )
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub surface: OutputSurface,
    pub gemini: GeminiConfig,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn new(surface: OutputSurface) -> Self {
        Config {
            surface,
            gemini: GeminiConfig::default(),
            output_dir: surface.default_output_dir(),
        }
    }

    pub fn from_env(surface: OutputSurface) -> Self {
        Self::from_lookup(surface, |key| env::var(key).ok())
    }

    fn from_lookup(surface: OutputSurface, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let output_dir = match lookup(surface.output_dir_var()).filter(|v| !v.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => env::current_dir()
                .map(|cwd| cwd.join(surface.default_output_dir()))
                .unwrap_or_else(|_| surface.default_output_dir()),
        };

        Config {
            surface,
            gemini: GeminiConfig::from_lookup(&lookup),
            output_dir,
        }
    }

    pub fn with_gemini(mut self, gemini: GeminiConfig) -> Self {
        self.gemini = gemini;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }
}

/// Load `~/.claude/.env` and then `./.env`.
///
/// `~/.claude/.env` replaces variables that are already set; `./.env` only
/// fills in the ones still missing. Returns the files that were read so the
/// caller can log them once a logger is up.
pub fn load_env_files() -> Vec<PathBuf> {
    let mut loaded = Vec::new();

    if let Some(path) = dirs::home_dir().and_then(|home| load_claude_env(&home)) {
        loaded.push(path);
    }

    if let Ok(path) = dotenv::dotenv() {
        loaded.push(path);
    }

    loaded
}

fn load_claude_env(home: &Path) -> Option<PathBuf> {
    let path = home.join(".claude").join(".env");
    if !path.is_file() {
        return None;
    }
    load_overriding(&path).ok()?;
    Some(path)
}

fn load_overriding(path: &Path) -> dotenv::Result<()> {
    for item in dotenv::from_path_iter(path)? {
        let (key, value) = item?;
        env::set_var(key, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn gemini_key_wins_over_google_key() {
        let config = GeminiConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "gem"),
            ("GOOGLE_API_KEY", "goo"),
        ]));
        assert_eq!(config.api_key().unwrap(), "gem");

        let config = GeminiConfig::from_lookup(lookup(&[("GOOGLE_API_KEY", "goo")]));
        assert_eq!(config.api_key().unwrap(), "goo");
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let config = GeminiConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")]));
        assert!(matches!(config.api_key(), Err(ThumbkitError::ConfigError(_))));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn output_dir_comes_from_surface_variable() {
        let vars = [
            ("THUMBKIT_OUTPUT_DIR", "/tmp/thumbs"),
            ("NANOBANANA_OUTPUT_DIR", "/tmp/banana"),
        ];
        let cli = Config::from_lookup(OutputSurface::Cli, lookup(&vars));
        assert_eq!(cli.output_dir, PathBuf::from("/tmp/thumbs"));
        let server = Config::from_lookup(OutputSurface::Server, lookup(&vars));
        assert_eq!(server.output_dir, PathBuf::from("/tmp/banana"));
    }

    #[test]
    fn output_dir_falls_back_under_cwd() {
        let config = Config::from_lookup(OutputSurface::Server, lookup(&[]));
        assert!(config.output_dir.ends_with(".nanobanana-generations"));
        let config = Config::from_lookup(OutputSurface::Cli, lookup(&[]));
        assert!(config.output_dir.ends_with("youtube/thumbnails"));
    }

    #[test]
    fn prefixes_follow_surface_and_mode() {
        assert_eq!(OutputSurface::Cli.file_prefix(RequestMode::Edit), "thumbkit-edit");
        assert_eq!(OutputSurface::Server.file_prefix(RequestMode::Generate), "nanobanana");
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff(1), Duration::from_secs(1));
        assert_eq!(retry.backoff(3), Duration::from_secs(4));
        assert_eq!(retry.backoff(40), Duration::from_secs(60));
    }

    #[test]
    fn claude_env_replaces_existing_variables() {
        let home = tempfile::tempdir().unwrap();
        let claude_dir = home.path().join(".claude");
        std::fs::create_dir(&claude_dir).unwrap();
        std::fs::write(
            claude_dir.join(".env"),
            "THUMBKIT_TEST_CLAUDE_KEY=from-claude\n",
        )
        .unwrap();
        env::set_var("THUMBKIT_TEST_CLAUDE_KEY", "stale-shell-key");

        let loaded = load_claude_env(home.path());

        assert_eq!(loaded, Some(claude_dir.join(".env")));
        assert_eq!(env::var("THUMBKIT_TEST_CLAUDE_KEY").unwrap(), "from-claude");
        env::remove_var("THUMBKIT_TEST_CLAUDE_KEY");
    }

    #[test]
    fn missing_claude_env_is_skipped() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(load_claude_env(home.path()), None);
    }
}
