//! Durable chunk storage with vector similarity search.

pub mod client;
mod memory;
pub mod schema;
pub mod types;

pub use client::PgVectorStore;
pub use memory::MemoryVectorStore;
pub use schema::TableName;
pub use types::{ChunkInsert, SearchRow, StoreError, StoredChunk};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, VectorStoreBackend};

/// Storage operations shared by the document pipeline and the query path.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the chunk table and its constraints if missing. Safe to call on every start.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Replace every row of `(index_name, filename)` with `chunks` in one transaction.
    ///
    /// On failure the previously stored chunk set is left intact.
    async fn upsert_chunks(
        &self,
        index_name: &str,
        filename: &str,
        chunks: Vec<ChunkInsert>,
    ) -> Result<(), StoreError>;

    /// Remove every row of `(index_name, filename)`, returning how many were deleted.
    async fn delete_chunks(&self, index_name: &str, filename: &str) -> Result<u64, StoreError>;

    /// Up to `top_k` rows of `index_name` closest to `embedding`, most similar first.
    async fn search(
        &self,
        index_name: &str,
        embedding: &[f32],
        top_k: i64,
    ) -> Result<Vec<SearchRow>, StoreError>;

    /// Stored chunks of one document ordered by chunk index.
    async fn document_chunks(
        &self,
        index_name: &str,
        filename: &str,
    ) -> Result<Vec<StoredChunk>, StoreError>;
}

/// Shared handle to the configured vector store.
pub type SharedVectorStore = Arc<dyn VectorStore>;

/// Construct the configured backend and make sure its schema exists.
pub async fn init_vector_store(config: &Config) -> Result<SharedVectorStore, StoreError> {
    let store: SharedVectorStore = match config.vector_store {
        VectorStoreBackend::Postgres => Arc::new(PgVectorStore::connect(
            &config.database_url,
            TableName::parse(&config.vector_table)?,
            config.embedding_dimension,
            config.external_timeout(),
        )
        .await?),
        VectorStoreBackend::Memory => {
            tracing::warn!("Using in-memory vector store; chunks are lost on restart");
            Arc::new(MemoryVectorStore::new(config.embedding_dimension))
        }
    };
    store.ensure_schema().await?;
    Ok(store)
}

/// Similarity reported to callers: `1 - distance`, rounded to four decimal places.
pub(crate) fn similarity_from_distance(distance: f64) -> f64 {
    ((1.0 - distance) * 10_000.0).round() / 10_000.0
}
