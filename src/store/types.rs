//! Shared types used by the vector store backends.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Errors returned while reading or writing chunk rows.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be reached.
    #[error("Failed to connect to vector store: {0}")]
    Connect(String),
    /// Connecting or running the operation exceeded the store's deadline.
    #[error("Vector store operation timed out after {0:?}")]
    Timeout(Duration),
    /// A statement or transaction failed; any open transaction was rolled back.
    #[error("Vector store query failed: {0}")]
    Query(#[from] tokio_postgres::Error),
    /// Table identifier was empty or malformed.
    #[error("Invalid vector table name: {0}")]
    InvalidTable(String),
    /// An embedding's width differs from the table's vector column.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Width of the vector column.
        expected: usize,
        /// Width of the rejected embedding.
        actual: usize,
    },
    /// Chunk index does not fit the integer column.
    #[error("Chunk index {0} is out of range")]
    ChunkIndexOutOfRange(usize),
}

/// One chunk of a document ready to be written.
#[derive(Debug, Clone)]
pub struct ChunkInsert {
    /// Zero-based position within the document.
    pub chunk_index: usize,
    /// Chunk text.
    pub text: String,
    /// Embedding of `text`.
    pub embedding: Vec<f32>,
}

/// Row returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRow {
    /// Document the chunk belongs to.
    pub filename: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    /// Chunk text.
    pub chunk_text: String,
    /// `1 - cosine distance`, rounded to four decimal places.
    pub similarity: f64,
}

/// Stored chunk text keyed by its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChunk {
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    /// Chunk text.
    pub text: String,
}
