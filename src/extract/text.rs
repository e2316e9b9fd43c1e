use super::{ExtractError, Extractor};

/// Plain text and markdown, decoded as UTF-8 with invalid bytes replaced.
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn extensions(&self) -> &'static [&'static str] {
        &["txt", "md"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
