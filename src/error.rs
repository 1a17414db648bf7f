//! Error taxonomy for the indexing and retrieval pipeline.
//!
//! The categories matter because callers treat them differently: indexing
//! failures are logged and swallowed by [`crate::indexer::Indexer::index_record`],
//! search failures propagate to the CLI/HTTP boundary, and configuration
//! failures abort startup.

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (API key, index name, endpoint, model).
    /// Raised at handle construction, before any request is made.
    #[error("configuration error: {0}")]
    Config(String),

    /// Model load or inference failure on non-empty input.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Remote vector index failure: connect, upsert, query, delete, or stats.
    /// Timeouts surface here; the client never retries.
    #[error("vector index error: {0}")]
    Store(String),

    /// Empty or whitespace-only search query, rejected before embedding.
    #[error("search query must not be empty")]
    InvalidQuery,

    /// System-of-record failure while reading or writing meeting rows.
    #[error("record store error: {0}")]
    Records(#[from] sqlx::Error),
}
