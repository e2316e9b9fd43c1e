//! MCP server exposing one query tool per catalog index.

use std::{borrow::Cow, sync::Arc};

use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, InitializeRequestParam, InitializeResult,
        ListToolsResult, PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
        ToolAnnotations,
    },
    service::{Peer, RequestContext, RoleServer},
};
use tokio::sync::Mutex;

use crate::mcp::{
    handlers::query::handle_query,
    registry::{RefreshOutcome, ToolRegistry},
    schemas,
};

/// MCP server backed by a [`ToolRegistry`].
///
/// The tool list is read from the registry on every request, so a refresh takes effect
/// immediately. The connected peer is remembered so it can be told when the list changes.
#[derive(Clone)]
pub struct DocRagMcpServer {
    registry: Arc<ToolRegistry>,
    peer: Arc<Mutex<Option<Peer<RoleServer>>>>,
}

impl DocRagMcpServer {
    /// Create a server answering from `registry`.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            peer: Arc::new(Mutex::new(None)),
        }
    }

    /// Refresh the registry and notify the peer when the tool set changed.
    ///
    /// Catalog failures are logged and leave the tools untouched.
    pub async fn refresh_tools(&self) -> Option<RefreshOutcome> {
        match self.registry.refresh().await {
            Ok(outcome) => {
                if outcome.changed() {
                    self.notify_tool_list_changed().await;
                }
                Some(outcome)
            }
            Err(error) => {
                tracing::warn!(%error, "Skipping tool refresh");
                None
            }
        }
    }

    async fn notify_tool_list_changed(&self) {
        let peer = self.peer.lock().await.clone();
        if let Some(peer) = peer
            && let Err(error) = peer.notify_tool_list_changed().await
        {
            tracing::warn!(%error, "Failed to send tools/list_changed notification");
        }
    }

    async fn remember_peer(&self, peer: &Peer<RoleServer>) {
        let mut guard = self.peer.lock().await;
        if guard.is_none() {
            *guard = Some(peer.clone());
        }
    }

    async fn describe_tools(&self) -> Vec<Tool> {
        let input_schema = Arc::new(schemas::query_input_schema(self.registry.default_top_k()));
        let output_schema = Arc::new(schemas::query_output_schema());
        self.registry
            .tools()
            .await
            .into_iter()
            .map(|tool| {
                let title = format!("Query {}", tool.index_name);
                Tool {
                    name: Cow::Owned(tool.name),
                    title: Some(title.clone()),
                    description: Some(Cow::Owned(tool.description)),
                    input_schema: input_schema.clone(),
                    output_schema: Some(output_schema.clone()),
                    annotations: Some(
                        ToolAnnotations::with_title(title)
                            .read_only(true)
                            .idempotent(true)
                            .open_world(false),
                    ),
                    icons: None,
                }
            })
            .collect()
    }
}

impl ServerHandler for DocRagMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "docrag".to_string();
        implementation.title = Some("Document RAG".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_tool_list_changed()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Each `query-<index>` tool searches one document index and returns the most similar chunks with their filename, position and similarity.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn initialize(
        &self,
        request: InitializeRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<InitializeResult, McpError>> + Send + '_ {
        async move {
            if context.peer.peer_info().is_none() {
                context.peer.set_peer_info(request);
            }
            self.remember_peer(&context.peer).await;
            Ok(self.get_info())
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            self.remember_peer(&context.peer).await;
            Ok(ListToolsResult::with_all_items(self.describe_tools().await))
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            self.remember_peer(&context.peer).await;
            tracing::debug!(tool = %request.name, "Tool call");
            handle_query(&self.registry, request.name.as_ref(), request.arguments).await
        }
    }
}
