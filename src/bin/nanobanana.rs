use rmcp::{transport::stdio, ServiceExt};
use thumbkit::{
    config::load_env_files,
    logger::{self, LoggerConfig},
    mcp::NanobananaServer,
    Config, OutputSurface,
};

/// Optional log file for hosts that discard the server's stderr.
const LOG_FILE_VAR: &str = "THUMBKIT_LOG_FILE";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_env_files();

    let mut log_config = LoggerConfig::server().with_env_level();
    if let Ok(path) = std::env::var(LOG_FILE_VAR) {
        log_config = log_config.with_file_output(&path);
    }
    logger::init_with_config(log_config)?;

    for path in &loaded {
        log::info!("📄 Loaded environment from {}", path.display());
    }

    let config = Config::from_env(OutputSurface::Server);
    logger::log_config_info(&config);
    if config.gemini.api_key.is_none() {
        log::warn!("⚠️  No API key set; tool calls will fail until GEMINI_API_KEY is provided");
    }

    let server = NanobananaServer::new(config);
    tokio::fs::create_dir_all(server.output_dir()).await?;

    log::info!("🍌 nanobanana MCP server listening on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        log::error!("❌ Failed to start MCP service: {:?}", e);
    })?;
    service.waiting().await?;

    log::info!("👋 nanobanana MCP server stopped");
    Ok(())
}
