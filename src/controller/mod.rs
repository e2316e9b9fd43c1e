//! Client side of the controller API: the index catalog and the document status sink.

mod client;

pub use client::ControllerClient;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Errors returned while talking to the controller API.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Base URL failed to parse or cannot carry path segments.
    #[error("Invalid controller URL: {0}")]
    InvalidUrl(String),
    /// The request did not finish within the configured timeout.
    #[error("Controller request timed out")]
    Timeout,
    /// Transport failed before a response arrived.
    #[error("Controller request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Controller responded with an unexpected status code.
    #[error("Unexpected controller response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the controller.
        status: StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },
    /// Response body did not have the expected shape.
    #[error("Invalid controller response: {0}")]
    InvalidResponse(String),
}

/// A logical document collection advertised by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDescriptor {
    /// Index name; also the object-storage bucket holding its documents.
    pub name: String,
    /// Human-readable description, possibly empty.
    pub description: String,
}

impl IndexDescriptor {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Processing state of one document as reported to the status sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    /// The pipeline picked the document up.
    Processing,
    /// All chunks were stored.
    Processed,
    /// The pipeline aborted with the given message.
    Failed(String),
}

impl DocumentStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed(_) => "failed",
        }
    }

    /// Error message carried by a failed status; empty otherwise.
    pub fn error_msg(&self) -> &str {
        match self {
            Self::Failed(message) => message,
            _ => "",
        }
    }
}

/// Source of the current set of indices.
#[async_trait]
pub trait IndexCatalog: Send + Sync {
    /// Fetch every index currently known to the catalog.
    async fn list_indices(&self) -> Result<Vec<IndexDescriptor>, ControllerError>;
}

/// Write-only sink for per-document processing status.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Record `status` for `(index_name, filename)`.
    async fn report(
        &self,
        index_name: &str,
        filename: &str,
        status: &DocumentStatus,
    ) -> Result<(), ControllerError>;

    /// Remove the status entry of a deleted document. Absent entries are not an error.
    async fn clear(&self, index_name: &str, filename: &str) -> Result<(), ControllerError>;
}
