use lopdf::Document;

use super::{ExtractError, Extractor};

/// PDF documents; page texts are concatenated in page order, separated by blank lines.
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn extensions(&self) -> &'static [&'static str] {
        &["pdf"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let document =
            Document::load_mem(bytes).map_err(|e| ExtractError::failed("unreadable PDF", e))?;

        let mut pages = Vec::new();
        for page_number in document.get_pages().into_keys() {
            let text = document
                .extract_text(&[page_number])
                .map_err(|e| ExtractError::failed(&format!("page {page_number}"), e))?;
            let text = text.trim();
            if !text.is_empty() {
                pages.push(text.to_string());
            }
        }

        tracing::debug!(pages = pages.len(), "Extracted PDF text");
        Ok(pages.join("\n\n"))
    }
}
