//! Format-specific text extraction keyed by file extension.
//!
//! Each handler turns raw document bytes into a linear text approximation that preserves
//! reading order. Handlers are synchronous and CPU-bound; async callers run them on the
//! blocking pool.

mod docx;
mod pdf;
mod registry;
mod tabular;
mod text;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use registry::{ExtractorRegistry, extension_of};
pub use tabular::{CsvExtractor, JsonExtractor};
pub use text::PlainTextExtractor;

use thiserror::Error;

/// Errors raised while turning document bytes into text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No handler is registered for the file extension.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),
    /// The handler could not read the document (corrupt file, decode error).
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),
}

impl ExtractError {
    pub(crate) fn failed(context: &str, error: impl std::fmt::Display) -> Self {
        Self::ExtractionFailed(format!("{context}: {error}"))
    }
}

/// A text extraction strategy for one family of file formats.
pub trait Extractor: Send + Sync {
    /// Lowercase file extensions, without the leading dot, handled by this extractor.
    fn extensions(&self) -> &'static [&'static str];

    /// Produce the document's text from its raw bytes.
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}
