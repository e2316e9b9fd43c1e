use async_trait::async_trait;

use super::{EmbeddingClient, EmbeddingClientError};

/// Deterministic embedding client that folds text bytes into a normalized vector.
///
/// Needs no model or network; identical text always yields identical vectors.
pub struct HashEmbeddingClient {
    dimension: usize,
}

impl HashEmbeddingClient {
    /// Construct a client producing vectors of `dimension` floats.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        tracing::trace!(count = texts.len(), dimension = self.dimension, "Hashing texts");
        Ok(texts
            .iter()
            .map(|text| Self::encode(text, self.dimension))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn vectors_are_normalized_and_order_preserving() {
        let client = HashEmbeddingClient::new(8);
        let vectors = client
            .generate_embeddings(vec!["alpha".into(), "beta".into(), "alpha".into()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], vectors[2]);
        assert_ne!(vectors[0], vectors[1]);
        let norm: f32 = vectors[1].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_batch_yields_no_vectors() {
        let client = HashEmbeddingClient::new(4);
        assert!(client.generate_embeddings(Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_dimension_fails() {
        let client = HashEmbeddingClient::new(0);
        assert!(client.embed("text").await.is_err());
    }
}
