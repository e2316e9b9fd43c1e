//! Read access to uploaded documents in S3-compatible object storage.

mod s3;
mod signing;

pub use s3::S3ObjectStorage;
pub use signing::Credentials;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while fetching an object.
#[derive(Debug, Error)]
pub enum ObjectStorageError {
    /// The object does not exist.
    #[error("Object {bucket}/{key} not found")]
    NotFound {
        /// Bucket that was queried.
        bucket: String,
        /// Key that was requested.
        key: String,
    },
    /// The request did not finish within the configured timeout.
    #[error("Object storage request timed out")]
    Timeout,
    /// Endpoint URL could not be parsed.
    #[error("Invalid object storage endpoint: {0}")]
    InvalidEndpoint(String),
    /// The request could not be signed with the configured credentials.
    #[error("Failed to sign object storage request: {0}")]
    Signing(String),
    /// Transport failed before a response arrived.
    #[error("Object storage request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Storage responded with an unexpected status code.
    #[error("Unexpected object storage response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the storage service.
        status: reqwest::StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },
}

/// Fetches raw object bytes by bucket and key.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Download the full contents of `bucket/key`.
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStorageError>;
}
