use async_trait::async_trait;
use ollama_rs::Ollama;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

use super::{EmbeddingClient, EmbeddingClientError, ensure_count};

/// Embeddings served by an Ollama runtime.
pub struct OllamaEmbeddingClient {
    client: Ollama,
    model: String,
    dimension: usize,
}

impl OllamaEmbeddingClient {
    /// Create a client for the Ollama instance at `base_url` (for example `http://127.0.0.1:11434`).
    pub fn new(
        base_url: &str,
        model: &str,
        dimension: usize,
    ) -> Result<Self, EmbeddingClientError> {
        let url = reqwest::Url::parse(base_url).map_err(|e| {
            EmbeddingClientError::Unavailable(format!("invalid Ollama URL '{base_url}': {e}"))
        })?;
        let host = url.host_str().ok_or_else(|| {
            EmbeddingClientError::Unavailable(format!("Ollama URL '{base_url}' has no host"))
        })?;
        let port = url.port_or_known_default().unwrap_or(11434);

        Ok(Self {
            client: Ollama::new(format!("{}://{host}", url.scheme()), port),
            model: model.to_string(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let expected = texts.len();
        let request =
            GenerateEmbeddingsRequest::new(self.model.clone(), EmbeddingsInput::Multiple(texts));

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| EmbeddingClientError::GenerationFailed(e.to_string()))?;

        ensure_count(expected, &response.embeddings)?;
        Ok(response.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
