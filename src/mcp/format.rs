//! Formatting helpers for query tool responses.

use serde::Serialize;
use serde_json::{Value, json};

use crate::store::SearchRow;

/// Prefix shared by every query tool name.
pub(crate) const TOOL_PREFIX: &str = "query-";

/// Tool name exposed for `index_name`.
pub(crate) fn tool_name(index_name: &str) -> String {
    format!("{TOOL_PREFIX}{index_name}")
}

/// Description shown for an index, falling back to a generic one when the catalog has none.
pub(crate) fn tool_description(index_name: &str, description: &str) -> String {
    let description = description.trim();
    if description.is_empty() {
        format!("Query the '{index_name}' RAG index for relevant documents.")
    } else {
        description.to_string()
    }
}

#[derive(Serialize)]
struct QueryResponse<'a> {
    results: &'a [SearchRow],
}

/// Structured payload returned by a query tool.
pub(crate) fn query_payload(rows: &[SearchRow]) -> Value {
    serde_json::to_value(QueryResponse { results: rows }).unwrap_or_else(|error| {
        tracing::warn!(%error, "Failed to serialize query results");
        json!({ "results": [] })
    })
}
