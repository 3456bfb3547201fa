//! Typed failures of the ingestion and retrieval contracts.
//!
//! Store and provider seams return `anyhow::Result`; the orchestrator and the
//! retrieval service classify those failures into the enums below so callers
//! can tell a bad file from a broken database from an unreachable embedding
//! provider.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The file could not be parsed, or required columns are missing.
    /// Raised before any write.
    #[error("invalid catalog file: {0}")]
    Validation(String),

    /// A relational write failed; the whole batch was rolled back and no
    /// vectors were written.
    #[error("catalog write failed for tenant '{tenant_id}', batch rolled back: {cause:#}")]
    Persistence {
        tenant_id: String,
        cause: anyhow::Error,
    },

    /// The embedding provider failed after the relational phase committed.
    #[error("embedding failed for tenant '{tenant_id}' (relational catalog committed; run reindex): {cause:#}")]
    Embedding {
        tenant_id: String,
        cause: anyhow::Error,
    },

    /// The vector index write failed after the relational phase committed.
    #[error("vector index write failed for tenant '{tenant_id}' (relational catalog committed; run reindex): {cause:#}")]
    VectorIndex {
        tenant_id: String,
        cause: anyhow::Error,
    },
}

impl IngestError {
    /// Short machine-readable code used by the HTTP adapter.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Validation(_) => "validation",
            IngestError::Persistence { .. } => "persistence",
            IngestError::Embedding { .. } => "embedding",
            IngestError::VectorIndex { .. } => "vector_index",
        }
    }
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("vector index query failed: {0:#}")]
    Index(anyhow::Error),
}

impl RetrievalError {
    pub fn code(&self) -> &'static str {
        match self {
            RetrievalError::Embedding(_) => "embedding",
            RetrievalError::Index(_) => "vector_index",
        }
    }
}

/// Failures of [`reindex_tenant`](crate::ingest::reindex_tenant).
#[derive(Debug, Error)]
pub enum ReindexError {
    #[error("could not read catalog for tenant '{tenant_id}': {cause:#}")]
    Catalog {
        tenant_id: String,
        cause: anyhow::Error,
    },

    #[error("embedding provider is disabled; configure [embedding] before reindexing")]
    EmbeddingsDisabled,

    #[error("embedding failed during reindex of tenant '{tenant_id}': {cause:#}")]
    Embedding {
        tenant_id: String,
        cause: anyhow::Error,
    },

    #[error("vector index update failed during reindex of tenant '{tenant_id}': {cause:#}")]
    VectorIndex {
        tenant_id: String,
        cause: anyhow::Error,
    },
}
