//! Handler shared by every `query-<index>` tool.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;

use crate::mcp::{
    format::query_payload,
    handlers::parse_arguments,
    registry::{QueryError, ToolRegistry},
};

/// Arguments accepted by a query tool.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct QueryToolRequest {
    /// Text to embed and search for.
    pub(crate) query: String,
    /// Optional result limit; the registry default applies when absent.
    #[serde(default)]
    pub(crate) top_k: Option<i64>,
}

/// Run the query tool `name` and wrap its rows in a structured result.
pub(crate) async fn handle_query(
    registry: &ToolRegistry,
    name: &str,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let QueryToolRequest { query, top_k } = parse_arguments(arguments)?;
    let rows = registry
        .query(name, &query, top_k)
        .await
        .map_err(map_query_error)?;
    Ok(CallToolResult::structured(query_payload(&rows)))
}

fn map_query_error(error: QueryError) -> McpError {
    match error {
        QueryError::UnknownTool(_) | QueryError::EmptyQuery => {
            McpError::invalid_params(error.to_string(), None)
        }
        QueryError::Embedding(inner) => {
            tracing::error!(error = %inner, "Failed to embed query");
            McpError::internal_error(format!("Failed to embed query: {inner}"), None)
        }
    }
}
