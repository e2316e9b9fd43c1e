//! Document processor entrypoint: receives object-storage notifications over HTTP and keeps
//! the chunk table in sync with the stored documents.
use anyhow::{Context, Result};
use clap::Parser;
use docrag::{
    api,
    config::{self, Config},
    controller::ControllerClient,
    embedding,
    extract::ExtractorRegistry,
    logging::{self, ConsoleTarget},
    objects::{Credentials, S3ObjectStorage},
    processing::{DocumentPipeline, SentenceChunker},
    store,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "docrag", about = "Document ingestion webhook server", version)]
struct Cli {
    /// Port to listen on; overrides SERVER_PORT.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(ConsoleTarget::Stdout);
    let config = config::init_config().context("failed to load configuration")?;

    let pipeline = build_pipeline(config).await?;
    let app = api::create_router(Arc::new(pipeline), config.pipeline_max_concurrency);

    let port = cli.port.unwrap_or(config.server_port);
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated unexpectedly")?;
    tracing::info!("Document processor stopped");
    Ok(())
}

async fn build_pipeline(config: &Config) -> Result<DocumentPipeline> {
    tracing::info!("Initializing embedding client");
    let embedder = embedding::init_embedding_client(config)
        .await
        .context("embedding provider unavailable")?;
    let store = store::init_vector_store(config)
        .await
        .context("failed to initialize vector store")?;
    let objects = S3ObjectStorage::new(
        &config.object_store_endpoint,
        Credentials {
            access_key: config.object_store_access_key.clone(),
            secret_key: config.object_store_secret_key.clone(),
            region: config.object_store_region.clone(),
        },
        config.external_timeout(),
    )
    .context("invalid object store endpoint")?;
    let controller = ControllerClient::new(&config.controller_api_url, config.external_timeout())
        .context("invalid controller API URL")?;
    let chunker = SentenceChunker::new(config.chunk_size, config.chunk_overlap)?;

    tracing::info!(
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        max_concurrency = config.pipeline_max_concurrency,
        "Document pipeline ready"
    );
    Ok(DocumentPipeline::new(
        Arc::new(objects),
        Arc::new(ExtractorRegistry::with_defaults()),
        chunker,
        embedder,
        store,
        Arc::new(controller),
    ))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
