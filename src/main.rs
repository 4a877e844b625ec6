use anyhow::Result;
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

use sequential_thinking::{SequentialThinkingService, ThinkingConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP protocol; logs and thought boxes go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ThinkingConfig::load()?;
    tracing::info!("Starting {} server", config.server.name);

    let service = SequentialThinkingService::new(&config);
    let server = service.serve(stdio()).await?;

    tracing::info!("{} ready for connections", config.server.name);

    server.waiting().await?;

    tracing::info!("{} shutting down", config.server.name);
    Ok(())
}
