//! In-process store for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::types::{ChunkInsert, SearchRow, StoreError, StoredChunk};
use super::{VectorStore, similarity_from_distance};

type DocumentKey = (String, String);

struct MemoryRow {
    seq: u64,
    chunk_index: usize,
    text: String,
    embedding: Vec<f32>,
}

/// Vector store kept in memory with brute-force cosine search.
///
/// A document's rows are swapped under a single write lock, so readers observe either the old
/// or the new chunk set.
pub struct MemoryVectorStore {
    dimension: usize,
    documents: RwLock<HashMap<DocumentKey, Vec<MemoryRow>>>,
    next_seq: AtomicU64,
}

impl MemoryVectorStore {
    /// Create an empty store for vectors of `dimension` floats.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            documents: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<(), StoreError> {
        if embedding.len() == self.dimension {
            Ok(())
        } else {
            Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            })
        }
    }

    fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
        let dot: f64 = a
            .iter()
            .zip(b)
            .map(|(x, y)| f64::from(*x) * f64::from(*y))
            .sum();
        let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
        let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 1.0;
        }
        1.0 - dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_chunks(
        &self,
        index_name: &str,
        filename: &str,
        chunks: Vec<ChunkInsert>,
    ) -> Result<(), StoreError> {
        let mut rows = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            self.check_dimension(&chunk.embedding)?;
            rows.push(MemoryRow {
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                chunk_index: chunk.chunk_index,
                text: chunk.text,
                embedding: chunk.embedding,
            });
        }

        let key = (index_name.to_string(), filename.to_string());
        let mut documents = self.documents.write().await;
        if rows.is_empty() {
            documents.remove(&key);
        } else {
            documents.insert(key, rows);
        }
        Ok(())
    }

    async fn delete_chunks(&self, index_name: &str, filename: &str) -> Result<u64, StoreError> {
        let key = (index_name.to_string(), filename.to_string());
        let removed = self.documents.write().await.remove(&key);
        Ok(removed.map_or(0, |rows| rows.len() as u64))
    }

    async fn search(
        &self,
        index_name: &str,
        embedding: &[f32],
        top_k: i64,
    ) -> Result<Vec<SearchRow>, StoreError> {
        if top_k <= 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(embedding)?;

        let documents = self.documents.read().await;
        let mut scored: Vec<(f64, u64, SearchRow)> = documents
            .iter()
            .filter(|((index, _), _)| index == index_name)
            .flat_map(|((_, filename), rows)| {
                rows.iter().map(move |row| {
                    let distance = Self::cosine_distance(&row.embedding, embedding);
                    (
                        distance,
                        row.seq,
                        SearchRow {
                            filename: filename.clone(),
                            chunk_index: row.chunk_index,
                            chunk_text: row.text.clone(),
                            similarity: similarity_from_distance(distance),
                        },
                    )
                })
            })
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let limit = usize::try_from(top_k).unwrap_or(usize::MAX);
        Ok(scored.into_iter().take(limit).map(|(_, _, row)| row).collect())
    }

    async fn document_chunks(
        &self,
        index_name: &str,
        filename: &str,
    ) -> Result<Vec<StoredChunk>, StoreError> {
        let key = (index_name.to_string(), filename.to_string());
        let documents = self.documents.read().await;
        let mut chunks: Vec<StoredChunk> = documents
            .get(&key)
            .map(|rows| {
                rows.iter()
                    .map(|row| StoredChunk {
                        chunk_index: row.chunk_index,
                        text: row.text.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        chunks.sort_by_key(|chunk| chunk.chunk_index);
        Ok(chunks)
    }
}
