//! Document Q&A server binary
//!
//! Run with: cargo run --bin paperchat-server

use paperchat::config::AppConfig;
use paperchat::providers::{EmbeddingProvider, OpenAiClient};
use paperchat::server::AppServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paperchat=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration: file path from PAPERCHAT_CONFIG, else defaults,
    // with secrets layered in from the environment either way
    let config = match std::env::var("PAPERCHAT_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)?,
        Err(_) => AppConfig::from_env(),
    };

    tracing::info!("Configuration loaded");
    tracing::info!("  - Completion model: {}", config.chat.completion_model);
    tracing::info!("  - Embedding model: {}", config.chat.embedding_model);
    tracing::info!("  - Vector index: {}", config.vector_index.host);
    tracing::info!("  - Database: {}", config.storage.database_path.display());

    if config.chat.api_key.is_empty() {
        tracing::warn!("Chat API key is empty; set PAPERCHAT_CHAT_API_KEY");
    }

    // Check the chat gateway before serving traffic
    let gateway = OpenAiClient::new(&config.chat)?;
    match gateway.health_check().await {
        Ok(true) => tracing::info!("Chat gateway is reachable"),
        _ => tracing::warn!("Chat gateway not reachable at {}", config.chat.base_url),
    }

    let server = AppServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}/api", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/documents/upload        - Upload documents");
    println!("  POST /api/documents/query         - Ask questions");
    println!("  POST /api/documents/query/stream  - Ask questions (SSE)");
    println!("  GET  /api/documents               - List documents");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
