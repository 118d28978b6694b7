//! RAG Server binary
//!
//! Run with: cargo run -p mood-rag --bin mood-rag-server -- --document songs.pdf

use anyhow::Context;
use clap::Parser;
use mood_rag::{config::RagConfig, generation::ChatBackend, server::RagServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "mood-rag-server",
    about = "Serve streaming, document-grounded music recommendations over HTTP"
)]
struct ServerCli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Document to load (overrides config and MOOD_RAG_DOCUMENT)
    #[arg(long)]
    document: Option<PathBuf>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mood_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = ServerCli::parse();

    let mut config = RagConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(document) = cli.document {
        config.corpus.source_path = document;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Document: {}", config.corpus.source_path.display());
    tracing::info!(
        "  - Embeddings: {:?} {} ({} dims)",
        config.embeddings.backend,
        config.embeddings.model,
        config.embeddings.dimensions
    );
    tracing::info!("  - LLM: {:?} {}", config.llm.backend, config.llm.model);
    tracing::info!("  - Top k: {}", config.retrieval.top_k);

    let server = RagServer::new(config)
        .await
        .context("initializing RAG service")?;

    if !server.state().service().backend().health_check().await? {
        tracing::warn!(
            "Chat backend at {} is not reachable yet; chat requests will fail until it is",
            server.state().config().llm.base_url
        );
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/chat      - Stream an answer (SSE)");
    println!("  POST /api/retrieve  - Nearest pages for a query");
    println!("  GET  /api/passages  - Corpus pages");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
