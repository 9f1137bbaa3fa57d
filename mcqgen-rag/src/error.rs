//! Error types for the `mcqgen-rag` crate.

use thiserror::Error;

/// Failures while embedding text or building and querying an index.
#[derive(Debug, Error)]
pub enum RagError {
    /// An embedding service rejected a request or returned something unusable.
    #[error("{provider} embedding failed: {message}")]
    EmbeddingError { provider: String, message: String },

    /// Embeddings and chunks do not line up.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Invalid chunking or retrieval parameters, or a blank API key.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, RagError>;
