//! Chunking and retrieval parameters.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 20;
pub const DEFAULT_TOP_K: usize = 4;

/// How documents are split and how many chunks a query returns.
///
/// Sizes count Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RagConfig {
    pub chunk_size: usize,
    /// Characters a chunk may repeat from the end of its predecessor.
    pub chunk_overlap: usize,
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP, top_k: DEFAULT_TOP_K }
    }
}

impl RagConfig {
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters can drive the chunker and the index.
    ///
    /// # Errors
    ///
    /// [`RagError::ConfigError`] for a zero chunk size or `top_k`, or an
    /// overlap that is not smaller than the chunk size.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk size must be at least 1".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be at least 1".into()));
        }
        Ok(())
    }
}

/// Builder for a validated [`RagConfig`], starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Validate and return the configuration. See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
