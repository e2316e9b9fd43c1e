//! Core data types and error definitions for the document pipeline.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::embedding::EmbeddingClientError;
use crate::extract::ExtractError;
use crate::objects::ObjectStorageError;
use crate::store::StoreError;

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// The configured target size cannot hold any text.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors that abort one document's pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Downloading the document from object storage failed.
    #[error("Failed to fetch document: {0}")]
    Fetch(#[from] ObjectStorageError),
    /// No extractor for the format, or the extractor rejected the bytes.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// Embedding provider failed to produce vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Writing or deleting chunk rows failed; nothing was committed.
    #[error("Failed to store chunks: {0}")]
    Storage(#[from] StoreError),
    /// A blocking worker panicked or was cancelled.
    #[error("Pipeline task failed: {0}")]
    Task(String),
}

/// Pipeline stages a document moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStage {
    /// Notification accepted.
    Received,
    /// Fetching bytes and extracting text.
    Extracting,
    /// Splitting text into chunks.
    Chunking,
    /// Computing chunk embeddings.
    Embedding,
    /// Replacing the document's rows.
    Storing,
    /// All chunks stored.
    Processed,
    /// Run aborted.
    Failed,
    /// Removing the document's rows.
    Deleting,
    /// Rows removed.
    Deleted,
}

impl DocumentStage {
    /// Lowercase stage name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Extracting => "extracting",
            Self::Chunking => "chunking",
            Self::Embedding => "embedding",
            Self::Storing => "storing",
            Self::Processed => "processed",
            Self::Failed => "failed",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for DocumentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a completed upload run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    /// Index the document belongs to.
    pub index_name: String,
    /// Document identifier within the index.
    pub filename: String,
    /// Number of chunks now stored for the document.
    pub chunk_count: usize,
}

/// Summary of a completed delete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// Index the document belonged to.
    pub index_name: String,
    /// Document identifier within the index.
    pub filename: String,
    /// Rows removed; zero when the document had no stored chunks.
    pub deleted_rows: u64,
}
