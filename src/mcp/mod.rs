//! Model Context Protocol (MCP) surface for document queries.
//!
//! Every index in the catalog is exposed as a `query-<index>` tool taking `query` and an
//! optional `top_k`. The [`ToolRegistry`] keeps the tool set in line with the catalog, the
//! [`DocRagMcpServer`] serves it over any rmcp transport and [`run_refresh_loop`] drives the
//! periodic reconciliation, notifying the client through `tools/list_changed`.

mod format;
pub mod handlers;
mod refresh;
pub mod registry;
mod schemas;
mod server;

pub use refresh::run_refresh_loop;
pub use registry::{QueryError, RefreshOutcome, RegisteredTool, ToolRegistry};
pub use server::DocRagMcpServer;
