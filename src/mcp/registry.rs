//! Per-index query tools reconciled against the index catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use super::format::{tool_description, tool_name};
use crate::controller::{ControllerError, IndexCatalog};
use crate::embedding::{EmbeddingClientError, SharedEmbeddingClient};
use crate::store::{SearchRow, SharedVectorStore};

/// Longest tool name most MCP hosts accept.
const MAX_TOOL_NAME_LEN: usize = 64;

/// Errors returned by a query tool invocation.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No tool with this name is currently exposed.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    /// Query text was blank. Rejecting it is this server's policy; the tool schema accepts it.
    #[error("query must not be empty: this server does not embed blank queries")]
    EmptyQuery,
    /// The query embedding could not be computed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
}

/// One exposed query tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredTool {
    /// Tool name, `query-<index>`.
    pub name: String,
    /// Index searched by the tool.
    pub index_name: String,
    /// Description shown to callers.
    pub description: String,
}

/// Tool-set changes applied by one refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Indices whose tools were registered.
    pub added: Vec<String>,
    /// Indices whose tools were re-registered with a new description.
    pub updated: Vec<String>,
    /// Indices whose tools were removed.
    pub removed: Vec<String>,
    /// Indices whose tools could not be registered; retried on the next refresh.
    pub failed: Vec<String>,
}

impl RefreshOutcome {
    /// Whether the exposed tool set changed.
    pub fn changed(&self) -> bool {
        !(self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty())
    }
}

#[derive(Default)]
struct RegistryState {
    /// Last catalog seen, `index -> description`.
    snapshot: BTreeMap<String, String>,
    /// Exposed tools keyed by tool name.
    tools: BTreeMap<String, RegisteredTool>,
}

/// Holds the exposed query tools and answers their invocations.
///
/// A refresh compares the catalog with the previous snapshot, registers new indices,
/// re-registers indices whose description changed and unregisters vanished ones. The snapshot
/// always becomes the latest catalog, even when individual registrations fail.
pub struct ToolRegistry {
    catalog: Arc<dyn IndexCatalog>,
    embedder: SharedEmbeddingClient,
    store: SharedVectorStore,
    default_top_k: i64,
    state: RwLock<RegistryState>,
}

impl ToolRegistry {
    /// Create an empty registry; nothing is exposed until the first refresh.
    pub fn new(
        catalog: Arc<dyn IndexCatalog>,
        embedder: SharedEmbeddingClient,
        store: SharedVectorStore,
        default_top_k: i64,
    ) -> Self {
        Self {
            catalog,
            embedder,
            store,
            default_top_k,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// `top_k` used when a caller omits it.
    pub fn default_top_k(&self) -> i64 {
        self.default_top_k
    }

    /// Reconcile the exposed tools with the catalog.
    ///
    /// A catalog failure leaves every tool and the snapshot untouched.
    pub async fn refresh(&self) -> Result<RefreshOutcome, ControllerError> {
        let indices = self.catalog.list_indices().await.inspect_err(|error| {
            tracing::warn!(%error, "Index catalog unavailable; keeping current tools");
        })?;
        let current: BTreeMap<String, String> = indices
            .into_iter()
            .map(|index| (index.name, index.description))
            .collect();

        let mut state = self.state.write().await;
        let mut outcome = RefreshOutcome::default();

        let removed: Vec<String> = state
            .snapshot
            .keys()
            .filter(|name| !current.contains_key(*name))
            .cloned()
            .collect();
        for index_name in removed {
            if state.tools.remove(&tool_name(&index_name)).is_some() {
                tracing::info!(index = %index_name, "Unregistered query tool");
                outcome.removed.push(index_name);
            }
        }

        for (index_name, description) in &current {
            let previous = state.snapshot.get(index_name);
            let exposed = state.tools.contains_key(&tool_name(index_name));
            let is_update = match previous {
                Some(previous) if exposed && previous == description => continue,
                Some(_) => exposed,
                None => false,
            };
            match register(index_name, description) {
                Ok(tool) => {
                    tracing::info!(
                        index = %index_name,
                        tool = %tool.name,
                        updated = is_update,
                        "Registered query tool"
                    );
                    state.tools.insert(tool.name.clone(), tool);
                    if is_update {
                        outcome.updated.push(index_name.clone());
                    } else {
                        outcome.added.push(index_name.clone());
                    }
                }
                Err(reason) => {
                    tracing::error!(index = %index_name, %reason, "Failed to register query tool");
                    outcome.failed.push(index_name.clone());
                }
            }
        }

        state.snapshot = current;
        tracing::debug!(
            tools = state.tools.len(),
            added = outcome.added.len(),
            updated = outcome.updated.len(),
            removed = outcome.removed.len(),
            failed = outcome.failed.len(),
            "Refreshed query tools"
        );
        Ok(outcome)
    }

    /// Currently exposed tools ordered by name.
    pub async fn tools(&self) -> Vec<RegisteredTool> {
        self.state.read().await.tools.values().cloned().collect()
    }

    /// Look up one exposed tool.
    pub async fn tool(&self, name: &str) -> Option<RegisteredTool> {
        self.state.read().await.tools.get(name).cloned()
    }

    /// Run the query tool `name`.
    ///
    /// Storage failures degrade to an empty result so the tool stays usable.
    pub async fn query(
        &self,
        name: &str,
        query: &str,
        top_k: Option<i64>,
    ) -> Result<Vec<SearchRow>, QueryError> {
        let tool = self
            .tool(name)
            .await
            .ok_or_else(|| QueryError::UnknownTool(name.to_string()))?;
        if query.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        let top_k = top_k.unwrap_or(self.default_top_k);
        if top_k <= 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        match self.store.search(&tool.index_name, &embedding, top_k).await {
            Ok(rows) => {
                tracing::debug!(index = %tool.index_name, top_k, results = rows.len(), "Query served");
                Ok(rows)
            }
            Err(error) => {
                tracing::warn!(index = %tool.index_name, %error, "Search failed; returning no results");
                Ok(Vec::new())
            }
        }
    }
}

/// Build the tool for one index, rejecting names hosts would refuse.
fn register(index_name: &str, description: &str) -> Result<RegisteredTool, String> {
    let name = tool_name(index_name);
    if name.len() > MAX_TOOL_NAME_LEN {
        return Err(format!("tool name longer than {MAX_TOOL_NAME_LEN} characters"));
    }
    if let Some(invalid) = index_name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!("invalid character {invalid:?} in index name"));
    }
    Ok(RegisteredTool {
        name,
        index_name: index_name.to_string(),
        description: tool_description(index_name, description),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::IndexDescriptor;
    use crate::embedding::HashEmbeddingClient;
    use crate::store::{ChunkInsert, MemoryVectorStore, VectorStore};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedCatalog {
        responses: Mutex<Vec<Result<Vec<IndexDescriptor>, ControllerError>>>,
    }

    impl ScriptedCatalog {
        fn push(&self, response: Result<Vec<IndexDescriptor>, ControllerError>) {
            self.responses.lock().unwrap().push(response);
        }
    }

    #[async_trait]
    impl IndexCatalog for ScriptedCatalog {
        async fn list_indices(&self) -> Result<Vec<IndexDescriptor>, ControllerError> {
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn registry(catalog: Arc<ScriptedCatalog>, store: SharedVectorStore) -> ToolRegistry {
        ToolRegistry::new(catalog, Arc::new(HashEmbeddingClient::new(8)), store, 5)
    }

    #[tokio::test]
    async fn catalog_failure_keeps_existing_tools() {
        let catalog = Arc::new(ScriptedCatalog::default());
        catalog.push(Ok(vec![IndexDescriptor::new("handbook", "HR")]));
        catalog.push(Err(ControllerError::Timeout));
        let registry = registry(catalog, Arc::new(MemoryVectorStore::new(8)));

        registry.refresh().await.unwrap();
        assert!(registry.refresh().await.is_err());

        let tools = registry.tools().await;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "query-handbook");
    }

    #[tokio::test]
    async fn invalid_index_is_skipped_without_blocking_others() {
        let catalog = Arc::new(ScriptedCatalog::default());
        catalog.push(Ok(vec![
            IndexDescriptor::new("bad name", ""),
            IndexDescriptor::new("faq", ""),
        ]));
        catalog.push(Ok(vec![
            IndexDescriptor::new("bad name", ""),
            IndexDescriptor::new("faq", ""),
        ]));
        let registry = registry(catalog, Arc::new(MemoryVectorStore::new(8)));

        let first = registry.refresh().await.unwrap();
        assert_eq!(first.added, vec!["faq".to_string()]);
        assert_eq!(first.failed, vec!["bad name".to_string()]);

        let second = registry.refresh().await.unwrap();
        assert!(!second.changed());
        assert_eq!(second.failed, vec!["bad name".to_string()]);
        assert_eq!(registry.tools().await.len(), 1);
    }

    #[tokio::test]
    async fn query_searches_the_tool_index() {
        let catalog = Arc::new(ScriptedCatalog::default());
        catalog.push(Ok(vec![IndexDescriptor::new("handbook", "")]));
        let store = Arc::new(MemoryVectorStore::new(8));
        let embedder = HashEmbeddingClient::new(8);
        let text = "Annual leave is 25 days.";
        let embedding = crate::embedding::EmbeddingClient::embed(&embedder, text)
            .await
            .unwrap();
        store
            .upsert_chunks(
                "handbook",
                "leave.md",
                vec![ChunkInsert {
                    chunk_index: 0,
                    text: text.into(),
                    embedding,
                }],
            )
            .await
            .unwrap();
        let registry = registry(catalog, store);
        registry.refresh().await.unwrap();

        let rows = registry
            .query("query-handbook", text, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].filename, "leave.md");
        assert_eq!(rows[0].similarity, 1.0);

        assert!(registry.query("query-handbook", text, Some(0)).await.unwrap().is_empty());
        assert!(matches!(
            registry.query("query-handbook", "   ", None).await,
            Err(QueryError::EmptyQuery)
        ));
        assert!(matches!(
            registry.query("query-missing", text, None).await,
            Err(QueryError::UnknownTool(_))
        ));
    }
}
