use std::path::Path;

const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../assets/system_prompt.md");

/// Text printed by `thumbkit docs`.
pub const CLI_REFERENCE: &str = include_str!("../assets/CLI_REFERENCE.md");

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn default_system_prompt() -> Option<String> {
    non_blank(DEFAULT_SYSTEM_PROMPT)
}

/// Read an override prompt. Failures are logged and yield `None`.
pub async fn read_system_prompt(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let prompt = non_blank(&text);
            if prompt.is_none() {
                log::warn!("System prompt file {} is empty", path.display());
            }
            prompt
        }
        Err(e) => {
            log::warn!("Could not read system prompt {}: {}", path.display(), e);
            None
        }
    }
}

/// The override when it is readable and non-empty, otherwise the bundled prompt.
pub async fn resolve_system_prompt(path: Option<&Path>) -> Option<String> {
    let custom = match path {
        Some(path) => read_system_prompt(path).await,
        None => None,
    };
    custom.or_else(default_system_prompt)
}
