//! Table naming and DDL for the chunk table.

use super::StoreError;

const DEFAULT_SCHEMA: &str = "public";

/// Schema-qualified Postgres table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    /// Build a table identifier from its parts.
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Result<Self, StoreError> {
        let schema = schema.into();
        let table = table.into();
        if schema.trim().is_empty() || table.trim().is_empty() {
            return Err(StoreError::InvalidTable(format!("{schema}.{table}")));
        }
        Ok(Self { schema, table })
    }

    /// Parse `table` or `schema.table`; a bare table lives in `public`.
    pub fn parse(value: &str) -> Result<Self, StoreError> {
        match value.split_once('.') {
            Some((schema, table)) => Self::new(schema, table),
            None => Self::new(DEFAULT_SCHEMA, value),
        }
    }

    /// Fully-qualified reference with quoted identifiers.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }

    /// Name of the secondary `(index_name, filename)` index.
    pub fn document_index_name(&self) -> String {
        quote_ident(&format!(
            "{}_{}_document_idx",
            sanitize_ident(&self.schema),
            sanitize_ident(&self.table)
        ))
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Quote a Postgres identifier, escaping embedded quotes.
pub fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}

fn sanitize_ident(input: &str) -> String {
    input
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}

/// Statements run by `ensure_schema`, in order.
pub(crate) fn schema_statements(table: &TableName, dimension: usize) -> Vec<String> {
    let qualified = table.qualified();
    vec![
        "CREATE EXTENSION IF NOT EXISTS vector".to_string(),
        format!(
            "CREATE TABLE IF NOT EXISTS {qualified} (
                id BIGSERIAL PRIMARY KEY,
                index_name TEXT NOT NULL,
                filename TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                chunk_text TEXT NOT NULL,
                embedding VECTOR({dimension}) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (index_name, filename, chunk_index)
            )"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {qualified} (index_name, filename)",
            table.document_index_name()
        ),
    ]
}

pub(crate) fn lock_document_sql() -> &'static str {
    "SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))"
}

pub(crate) fn delete_document_sql(table: &TableName) -> String {
    format!(
        "DELETE FROM {} WHERE index_name = $1 AND filename = $2",
        table.qualified()
    )
}

pub(crate) fn insert_chunk_sql(table: &TableName) -> String {
    format!(
        "INSERT INTO {} (index_name, filename, chunk_index, chunk_text, embedding) \
            VALUES ($1, $2, $3, $4, $5)",
        table.qualified()
    )
}

pub(crate) fn search_sql(table: &TableName) -> String {
    format!(
        "SELECT filename, chunk_index, chunk_text, embedding <=> $2 AS distance \
        FROM {} \
        WHERE index_name = $1 \
        ORDER BY embedding <=> $2 ASC, id ASC \
        LIMIT $3",
        table.qualified()
    )
}

pub(crate) fn document_chunks_sql(table: &TableName) -> String {
    format!(
        "SELECT chunk_index, chunk_text FROM {} \
        WHERE index_name = $1 AND filename = $2 \
        ORDER BY chunk_index ASC",
        table.qualified()
    )
}
