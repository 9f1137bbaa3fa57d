//! Flat in-memory retrieval index using cosine similarity.
//!
//! [`RetrievalIndex`] is built once from a set of chunks and never changes
//! afterwards. Queries score every chunk, which is fine for the size of a
//! single uploaded document.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Query text substituted for an empty query.
pub const FALLBACK_QUERY: &str = " ";

/// An immutable similarity index over the chunks of one document.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use mcqgen_rag::{Chunker, Document, HashEmbeddingProvider, RecursiveChunker, RetrievalIndex};
///
/// # tokio_test_block(async {
/// let chunks = RecursiveChunker::default().chunk(&Document::new("notes", "Water boils at 100 degrees."));
/// let index = RetrievalIndex::build(chunks, Arc::new(HashEmbeddingProvider::default())).await?;
/// let hits = index.query("boiling water", 4).await?;
/// assert_eq!(hits.len(), 1);
/// # Ok::<(), mcqgen_rag::RagError>(())
/// # }).unwrap();
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
pub struct RetrievalIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl fmt::Debug for RetrievalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalIndex")
            .field("chunks", &self.entries.len())
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

impl RetrievalIndex {
    /// Embed every chunk in one batch and store the vectors alongside them.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures, and returns [`RagError::IndexError`]
    /// when the provider returns a different number of vectors than chunks.
    pub async fn build(chunks: Vec<Chunk>, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        if chunks.is_empty() {
            debug!(provider = embedder.name(), "building empty index");
            return Ok(Self { entries: Vec::new(), embedder });
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = embedder.embed_batch(&texts).await.inspect_err(|e| {
            error!(provider = embedder.name(), error = %e, "chunk embedding failed");
        })?;

        if vectors.len() != chunks.len() {
            return Err(RagError::IndexError(format!(
                "{} returned {} embeddings for {} chunks",
                embedder.name(),
                vectors.len(),
                chunks.len()
            )));
        }

        debug!(provider = embedder.name(), chunk_count = chunks.len(), "index built");
        Ok(Self { entries: chunks.into_iter().zip(vectors).collect(), embedder })
    }

    /// Return the `k` chunks most similar to `text`, most relevant first.
    ///
    /// An empty query is replaced by [`FALLBACK_QUERY`], which yields a broad
    /// sample of the index rather than an error. Ties keep insertion order.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query = if text.is_empty() { FALLBACK_QUERY } else { text };
        let embedding = self.embedder.embed_query(query).await.inspect_err(|e| {
            error!(provider = self.embedder.name(), error = %e, "query embedding failed");
        })?;

        let mut scored: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|(chunk, vector)| SearchResult {
                chunk: chunk.clone(),
                score: cosine_similarity(vector, &embedding),
            })
            .collect();

        // `sort_by` is stable, so equal scores stay in insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        debug!(query_len = query.len(), result_count = scored.len(), "index queried");
        Ok(scored)
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
