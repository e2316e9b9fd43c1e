#![deny(missing_docs)]

//! Document retrieval-augmented generation: ingest documents from object storage into a
//! pgvector table and expose per-index similarity search as MCP tools.

/// HTTP webhook surface of the document processor.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Controller API client: index catalog and document status.
pub mod controller;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Text extraction from uploaded documents.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol query tools.
pub mod mcp;
/// Pipeline metrics helpers.
pub mod metrics;
/// Object storage access.
pub mod objects;
/// Document processing pipeline.
pub mod processing;
/// Chunk storage with vector similarity search.
pub mod store;
