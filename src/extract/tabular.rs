//! Structured formats flattened to delimited lines.

use super::{ExtractError, Extractor};

/// JSON documents, re-serialized with two-space indentation.
pub struct JsonExtractor;

impl Extractor for JsonExtractor {
    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| ExtractError::failed("invalid JSON", e))?;
        serde_json::to_string_pretty(&value).map_err(|e| ExtractError::failed("invalid JSON", e))
    }
}

/// CSV files, one line per record with fields joined by ` | `.
pub struct CsvExtractor;

impl Extractor for CsvExtractor {
    fn extensions(&self) -> &'static [&'static str] {
        &["csv"]
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut lines = Vec::new();
        for record in reader.byte_records() {
            let record = record.map_err(|e| ExtractError::failed("invalid CSV", e))?;
            let fields: Vec<_> = record.iter().map(String::from_utf8_lossy).collect();
            lines.push(fields.join(" | "));
        }
        Ok(lines.join("\n"))
    }
}
