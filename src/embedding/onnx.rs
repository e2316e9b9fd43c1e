//! In-process ONNX embeddings through `fastembed`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{EmbeddingClient, EmbeddingClientError, ensure_count};

/// Local sentence-embedding model loaded once and shared across tasks.
///
/// `TextEmbedding::embed` needs exclusive access, so calls are serialized through a mutex and
/// executed on the blocking pool.
pub struct FastEmbedClient {
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl FastEmbedClient {
    /// Load `model_name`, downloading it to the local cache on first use.
    pub async fn load(model_name: &str) -> Result<Self, EmbeddingClientError> {
        let (model, dimension) = resolve_model(model_name)?;
        let name = model_name.to_string();

        let text_model = tokio::task::spawn_blocking(move || {
            TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(false))
        })
        .await
        .map_err(|e| EmbeddingClientError::Unavailable(format!("model loader panicked: {e}")))?
        .map_err(|e| EmbeddingClientError::Unavailable(format!("failed to load {name}: {e}")))?;

        tracing::debug!(model = %name, dimension, "Loaded fastembed model");
        Ok(Self {
            model: Arc::new(Mutex::new(text_model)),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingClient for FastEmbedClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let expected = texts.len();
        let model = Arc::clone(&self.model);

        let vectors = tokio::task::spawn_blocking(move || {
            let mut model = model.lock().map_err(|_| {
                EmbeddingClientError::GenerationFailed("embedding model lock poisoned".to_string())
            })?;
            model
                .embed(texts, None)
                .map_err(|e| EmbeddingClientError::GenerationFailed(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingClientError::GenerationFailed(format!("embedding task failed: {e}")))??;

        ensure_count(expected, &vectors)?;
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Map a configured model identifier to a fastembed model and its output width.
fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize), EmbeddingClientError> {
    let short = name.rsplit('/').next().unwrap_or(name).to_ascii_lowercase();
    match short.as_str() {
        "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        "all-minilm-l12-v2" => Ok((EmbeddingModel::AllMiniLML12V2, 384)),
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
        "nomic-embed-text-v1.5" => Ok((EmbeddingModel::NomicEmbedTextV15, 768)),
        _ => Err(EmbeddingClientError::Unavailable(format!(
            "unsupported fastembed model '{name}'"
        ))),
    }
}
