//! MCP server entrypoint (stdio transport).
//!
//! Exposes one `query-<index>` tool per catalog index over stdio and refreshes the tool set
//! in the background. Logs go to stderr because stdout carries protocol frames.
use anyhow::{Context, Result};
use clap::Parser;
use docrag::{
    config,
    controller::ControllerClient,
    embedding,
    logging::{self, ConsoleTarget},
    mcp::{DocRagMcpServer, ToolRegistry, run_refresh_loop},
    store,
};
use rmcp::{service::ServiceExt, transport::stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "docrag-mcp", about = "Document query tools over MCP stdio", version)]
struct Cli {
    /// Seconds between catalog refreshes; overrides REFRESH_INTERVAL_SECS.
    #[arg(long)]
    refresh_interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(ConsoleTarget::Stderr);
    let config = config::init_config().context("failed to load configuration")?;

    tracing::info!("Pre-loading embedding model");
    let embedder = embedding::init_embedding_client(config)
        .await
        .context("embedding provider unavailable")?;
    let store = store::init_vector_store(config)
        .await
        .context("failed to initialize vector store")?;
    let catalog = ControllerClient::new(&config.controller_api_url, config.external_timeout())
        .context("invalid controller API URL")?;

    let registry = Arc::new(ToolRegistry::new(
        Arc::new(catalog),
        embedder,
        store,
        config.query_default_top_k,
    ));
    let server = DocRagMcpServer::new(registry);

    tracing::info!("Performing initial tool discovery");
    if let Some(outcome) = server.refresh_tools().await {
        tracing::info!(tools = outcome.added.len(), "Initial tools registered");
    }

    let period = cli
        .refresh_interval_secs
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.refresh_interval());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = tokio::spawn(run_refresh_loop(server.clone(), period, shutdown_rx));

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;
    let result = service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly");

    let _ = shutdown_tx.send(true);
    let _ = refresher.await;
    result?;
    Ok(())
}
