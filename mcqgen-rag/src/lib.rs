//! # mcqgen-rag
//!
//! Document chunking, text embeddings and a flat in-memory retrieval index.
//!
//! ## Overview
//!
//! - [`RecursiveChunker`] splits [`Document`]s into [`Chunk`]s of at most
//!   1000 characters with 20 characters of overlap by default
//! - [`EmbeddingProvider`] is the embedding seam, implemented by
//!   [`GeminiEmbeddingProvider`], [`OpenAIEmbeddingProvider`] and the offline
//!   [`HashEmbeddingProvider`]
//! - [`RetrievalIndex`] is built once per document and answers top-k
//!   cosine-similarity queries
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mcqgen_rag::{Chunker, Document, GeminiEmbeddingProvider, RecursiveChunker, RetrievalIndex};
//!
//! let chunks = RecursiveChunker::default().chunk(&Document::new("notes.txt", text));
//! let embedder = Arc::new(GeminiEmbeddingProvider::new(api_key)?);
//! let index = RetrievalIndex::build(chunks, embedder).await?;
//! let hits = index.query("the Krebs cycle", 4).await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod gemini;
pub mod index;
pub mod openai;

pub use chunking::{Chunker, RecursiveChunker};
pub use config::RagConfig;
pub use document::{Chunk, Document, SearchResult};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{RagError, Result};
pub use gemini::GeminiEmbeddingProvider;
pub use index::{FALLBACK_QUERY, RetrievalIndex, cosine_similarity};
pub use openai::OpenAIEmbeddingProvider;
