mod onnx;
mod hash;
mod ollama;

pub use onnx::FastEmbedClient;
pub use hash::HashEmbeddingClient;
pub use ollama::OllamaEmbeddingClient;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, EmbeddingProvider};

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider could not be initialized; fatal at startup.
    #[error("Embedding provider unavailable: {0}")]
    Unavailable(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider output width differs from the configured dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the vector table.
        expected: usize,
        /// Width of the vectors the provider produced.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text, preserving order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Width of the vectors this client produces.
    fn dimension(&self) -> usize;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        self.generate_embeddings(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                EmbeddingClientError::GenerationFailed("provider returned no vectors".to_string())
            })
    }
}

/// Shared handle to the process-wide embedding client.
pub type SharedEmbeddingClient = Arc<dyn EmbeddingClient + Send + Sync>;

/// Build the configured embedding client and warm it up.
///
/// One embedding is generated eagerly so model loading and connectivity failures surface at
/// startup, and its width is checked against `embedding_dimension`.
pub async fn init_embedding_client(
    config: &Config,
) -> Result<SharedEmbeddingClient, EmbeddingClientError> {
    let client: SharedEmbeddingClient = match config.embedding_provider {
        EmbeddingProvider::FastEmbed => {
            Arc::new(FastEmbedClient::load(&config.embedding_model).await?)
        }
        EmbeddingProvider::Ollama => Arc::new(OllamaEmbeddingClient::new(
            &config.ollama_url,
            &config.embedding_model,
            config.embedding_dimension,
        )?),
        EmbeddingProvider::Hash => Arc::new(HashEmbeddingClient::new(config.embedding_dimension)),
    };

    let probe = client
        .embed("warmup")
        .await
        .map_err(|e| EmbeddingClientError::Unavailable(e.to_string()))?;
    ensure_dimension(config.embedding_dimension, probe.len())?;

    tracing::info!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        dimension = probe.len(),
        "Embedding provider ready"
    );
    Ok(client)
}

pub(crate) fn ensure_dimension(expected: usize, actual: usize) -> Result<(), EmbeddingClientError> {
    if expected == actual {
        Ok(())
    } else {
        Err(EmbeddingClientError::DimensionMismatch { expected, actual })
    }
}

/// Fail unless the provider returned exactly one vector per input.
pub(crate) fn ensure_count(
    expected: usize,
    vectors: &[Vec<f32>],
) -> Result<(), EmbeddingClientError> {
    if vectors.len() == expected {
        Ok(())
    } else {
        Err(EmbeddingClientError::GenerationFailed(format!(
            "expected {expected} vectors, provider returned {}",
            vectors.len()
        )))
    }
}
