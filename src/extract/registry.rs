use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::{
    CsvExtractor, DocxExtractor, ExtractError, Extractor, JsonExtractor, PdfExtractor,
    PlainTextExtractor,
};

/// Extractors indexed by lowercase file extension.
pub struct ExtractorRegistry {
    by_extension: HashMap<String, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Create a registry with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    /// Registry covering txt, md, json, csv, pdf and docx.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PlainTextExtractor);
        registry.register(JsonExtractor);
        registry.register(CsvExtractor);
        registry.register(PdfExtractor);
        registry.register(DocxExtractor);
        registry
    }

    /// Register an extractor under every extension it declares, replacing earlier handlers.
    pub fn register<E: Extractor + 'static>(&mut self, extractor: E) {
        let extractor: Arc<dyn Extractor> = Arc::new(extractor);
        for extension in extractor.extensions() {
            self.by_extension
                .insert((*extension).to_string(), Arc::clone(&extractor));
        }
    }

    /// Whether a handler exists for the filename's extension.
    pub fn supports(&self, filename: &str) -> bool {
        self.by_extension.contains_key(&extension_of(filename))
    }

    /// Extract text from `bytes`, dispatching on the extension of `filename`.
    pub fn extract(&self, bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
        let extension = extension_of(filename);
        let extractor = self.by_extension.get(&extension).ok_or_else(|| {
            ExtractError::UnsupportedFormat(if extension.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{extension}")
            })
        })?;
        extractor.extract(bytes)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Lowercase extension of `filename` without the leading dot; empty when there is none.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}
