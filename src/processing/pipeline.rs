//! Document pipeline coordinating fetch, extraction, chunking, embedding, and storage.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    controller::{DocumentStatus, StatusSink},
    embedding::SharedEmbeddingClient,
    extract::ExtractorRegistry,
    metrics::{MetricsSnapshot, PipelineMetrics},
    objects::ObjectStorage,
    processing::{
        chunking::SentenceChunker,
        types::{DeleteOutcome, DocumentStage, PipelineError, UploadOutcome},
    },
    store::{ChunkInsert, SharedVectorStore},
};

/// Abstraction over the pipeline used by the webhook surface.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    /// Replace the stored chunks of `(index_name, filename)` with freshly computed ones.
    async fn process_upload(
        &self,
        index_name: &str,
        filename: &str,
    ) -> Result<UploadOutcome, PipelineError>;

    /// Remove every stored chunk of `(index_name, filename)`.
    async fn process_delete(
        &self,
        index_name: &str,
        filename: &str,
    ) -> Result<DeleteOutcome, PipelineError>;

    /// Current pipeline counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Turns upload and delete events into chunk rows.
///
/// Every collaborator is injected, so the webhook server builds one pipeline at startup and
/// shares it behind an `Arc` across concurrent runs. Runs for different documents are
/// independent; runs for the same document are serialized by the store's upsert.
pub struct DocumentPipeline {
    objects: Arc<dyn ObjectStorage>,
    extractors: Arc<ExtractorRegistry>,
    chunker: SentenceChunker,
    embedder: SharedEmbeddingClient,
    store: SharedVectorStore,
    status: Arc<dyn StatusSink>,
    metrics: Arc<PipelineMetrics>,
}

impl DocumentPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        objects: Arc<dyn ObjectStorage>,
        extractors: Arc<ExtractorRegistry>,
        chunker: SentenceChunker,
        embedder: SharedEmbeddingClient,
        store: SharedVectorStore,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            objects,
            extractors,
            chunker,
            embedder,
            store,
            status,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Status reports are best-effort; failures are logged and swallowed.
    async fn report_status(&self, index_name: &str, filename: &str, status: DocumentStatus) {
        if let Err(error) = self.status.report(index_name, filename, &status).await {
            tracing::warn!(
                index = index_name,
                filename,
                status = status.as_str(),
                %error,
                "Failed to report document status"
            );
        }
    }

    async fn run_upload(
        &self,
        index_name: &str,
        filename: &str,
    ) -> Result<UploadOutcome, PipelineError> {
        stage(index_name, filename, DocumentStage::Extracting);
        let bytes = self.objects.fetch(index_name, filename).await?;
        let registry = Arc::clone(&self.extractors);
        let name = filename.to_string();
        let text = tokio::task::spawn_blocking(move || registry.extract(&bytes, &name))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))??;
        tracing::debug!(
            index = index_name,
            filename,
            chars = text.len(),
            "Extracted text"
        );

        stage(index_name, filename, DocumentStage::Chunking);
        let chunks = self.chunker.chunk(&text);

        stage(index_name, filename, DocumentStage::Embedding);
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.generate_embeddings(texts).await?
        };
        debug_assert_eq!(chunks.len(), embeddings.len());

        let rows: Vec<ChunkInsert> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| ChunkInsert {
                chunk_index: chunk.index,
                text: chunk.text,
                embedding,
            })
            .collect();
        let chunk_count = rows.len();

        stage(index_name, filename, DocumentStage::Storing);
        self.store.upsert_chunks(index_name, filename, rows).await?;

        Ok(UploadOutcome {
            index_name: index_name.to_string(),
            filename: filename.to_string(),
            chunk_count,
        })
    }
}

fn stage(index_name: &str, filename: &str, stage: DocumentStage) {
    tracing::debug!(index = index_name, filename, stage = %stage, "Document stage");
}

#[async_trait]
impl DocumentProcessor for DocumentPipeline {
    async fn process_upload(
        &self,
        index_name: &str,
        filename: &str,
    ) -> Result<UploadOutcome, PipelineError> {
        tracing::info!(index = index_name, filename, "Processing upload");
        stage(index_name, filename, DocumentStage::Received);
        self.report_status(index_name, filename, DocumentStatus::Processing)
            .await;

        match self.run_upload(index_name, filename).await {
            Ok(outcome) => {
                self.report_status(index_name, filename, DocumentStatus::Processed)
                    .await;
                self.metrics.record_processed(outcome.chunk_count as u64);
                stage(index_name, filename, DocumentStage::Processed);
                tracing::info!(
                    index = index_name,
                    filename,
                    chunks = outcome.chunk_count,
                    "Document processed"
                );
                Ok(outcome)
            }
            Err(error) => {
                stage(index_name, filename, DocumentStage::Failed);
                tracing::error!(index = index_name, filename, %error, "Document processing failed");
                self.report_status(
                    index_name,
                    filename,
                    DocumentStatus::Failed(error.to_string()),
                )
                .await;
                self.metrics.record_failed();
                Err(error)
            }
        }
    }

    async fn process_delete(
        &self,
        index_name: &str,
        filename: &str,
    ) -> Result<DeleteOutcome, PipelineError> {
        tracing::info!(index = index_name, filename, "Processing delete");
        stage(index_name, filename, DocumentStage::Deleting);
        let deleted_rows = self
            .store
            .delete_chunks(index_name, filename)
            .await
            .inspect_err(|error| {
                tracing::error!(index = index_name, filename, %error, "Failed to delete chunks");
            })?;

        if let Err(error) = self.status.clear(index_name, filename).await {
            tracing::warn!(index = index_name, filename, %error, "Failed to clear document status");
        }
        self.metrics.record_deleted();
        stage(index_name, filename, DocumentStage::Deleted);
        tracing::info!(index = index_name, filename, deleted_rows, "Document deleted");

        Ok(DeleteOutcome {
            index_name: index_name.to_string(),
            filename: filename.to_string(),
            deleted_rows,
        })
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
