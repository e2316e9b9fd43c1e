//! pgvector-backed implementation of [`VectorStore`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use pgvector::Vector;
use tokio_postgres::{Client, Config as PgConfig, NoTls};

use super::schema::{
    TableName, delete_document_sql, document_chunks_sql, insert_chunk_sql, lock_document_sql,
    schema_statements, search_sql,
};
use super::types::{ChunkInsert, SearchRow, StoreError, StoredChunk};
use super::{VectorStore, similarity_from_distance};

/// Chunk table in Postgres with the pgvector extension.
///
/// Every operation opens its own connection and drops it when done, so no statement ever
/// waits on another task's connection. Connecting and running the operation share one
/// deadline; expiry surfaces as [`StoreError::Timeout`].
pub struct PgVectorStore {
    config: PgConfig,
    timeout: Duration,
    table: TableName,
    dimension: usize,
    delete_sql: String,
    insert_sql: String,
    search_sql: String,
    chunks_sql: String,
}

impl PgVectorStore {
    /// Build a store for `database_url` without contacting the database.
    pub fn new(
        database_url: &str,
        table: TableName,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut config: PgConfig = database_url
            .parse()
            .map_err(|e: tokio_postgres::Error| StoreError::Connect(e.to_string()))?;
        config.connect_timeout(timeout);
        Ok(Self {
            config,
            timeout,
            delete_sql: delete_document_sql(&table),
            insert_sql: insert_chunk_sql(&table),
            search_sql: search_sql(&table),
            chunks_sql: document_chunks_sql(&table),
            table,
            dimension,
        })
    }

    /// Build a store and verify the database is reachable within `timeout`.
    pub async fn connect(
        database_url: &str,
        table: TableName,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let store = Self::new(database_url, table, dimension, timeout)?;
        store
            .bounded(async {
                store.open().await?;
                Ok::<_, StoreError>(())
            })
            .await?;
        tracing::info!(table = %store.table, dimension, "Connected to pgvector store");
        Ok(store)
    }

    async fn open(&self) -> Result<Client, StoreError> {
        let (client, connection) = self
            .config
            .connect(NoTls)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::warn!(error = %err, "Postgres connection closed with error");
            }
        });
        Ok(client)
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
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
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.bounded(async {
            let client = self.open().await?;
            for statement in schema_statements(&self.table, self.dimension) {
                client.batch_execute(&statement).await?;
            }
            Ok::<_, StoreError>(())
        })
        .await?;
        tracing::debug!(table = %self.table, "Chunk table ready");
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
            let chunk_index = i32::try_from(chunk.chunk_index)
                .map_err(|_| StoreError::ChunkIndexOutOfRange(chunk.chunk_index))?;
            rows.push((chunk_index, chunk.text, Vector::from(chunk.embedding)));
        }

        // Dropping the client before commit (including on timeout) rolls the transaction back.
        let replaced = self
            .bounded(async {
                let mut client = self.open().await?;
                let transaction = client.transaction().await?;
                transaction
                    .execute(lock_document_sql(), &[&index_name, &filename])
                    .await?;
                let replaced = transaction
                    .execute(self.delete_sql.as_str(), &[&index_name, &filename])
                    .await?;
                let statement = transaction.prepare(&self.insert_sql).await?;
                for (chunk_index, text, vector) in &rows {
                    transaction
                        .execute(
                            &statement,
                            &[&index_name, &filename, chunk_index, text, vector],
                        )
                        .await?;
                }
                transaction.commit().await?;
                Ok::<_, StoreError>(replaced)
            })
            .await?;

        tracing::debug!(
            index = index_name,
            filename,
            replaced,
            inserted = rows.len(),
            "Replaced document chunks"
        );
        Ok(())
    }

    async fn delete_chunks(&self, index_name: &str, filename: &str) -> Result<u64, StoreError> {
        self.bounded(async {
            let client = self.open().await?;
            Ok::<_, StoreError>(client
                .execute(self.delete_sql.as_str(), &[&index_name, &filename])
                .await?)
        })
        .await
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

        let vector = Vector::from(embedding.to_vec());
        let rows = self
            .bounded(async {
                let client = self.open().await?;
                Ok::<_, StoreError>(client
                    .query(self.search_sql.as_str(), &[&index_name, &vector, &top_k])
                    .await?)
            })
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let chunk_index: i32 = row.get("chunk_index");
                let distance: f64 = row.get("distance");
                SearchRow {
                    filename: row.get("filename"),
                    chunk_index: usize::try_from(chunk_index).unwrap_or_default(),
                    chunk_text: row.get("chunk_text"),
                    similarity: similarity_from_distance(distance),
                }
            })
            .collect())
    }

    async fn document_chunks(
        &self,
        index_name: &str,
        filename: &str,
    ) -> Result<Vec<StoredChunk>, StoreError> {
        let rows = self
            .bounded(async {
                let client = self.open().await?;
                Ok::<_, StoreError>(client
                    .query(self.chunks_sql.as_str(), &[&index_name, &filename])
                    .await?)
            })
            .await?;
        Ok(rows
            .iter()
            .map(|row| {
                let chunk_index: i32 = row.get("chunk_index");
                StoredChunk {
                    chunk_index: usize::try_from(chunk_index).unwrap_or_default(),
                    text: row.get("chunk_text"),
                }
            })
            .collect())
    }
}
