//! Embeddings from the OpenAI `/embeddings` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "OpenAI";

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Embedding model used unless [`OpenAIEmbeddingProvider::with_model`] says otherwise.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// The endpoint rejects requests with more inputs than this.
const MAX_INPUTS_PER_REQUEST: usize = 2048;

/// Native output size of the published embedding models.
fn native_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

/// Embeds chunks and queries with an OpenAI embedding model.
///
/// Batches larger than the endpoint's input limit are split across several
/// requests; vectors come back in input order regardless of how the service
/// orders them.
///
/// ```rust,ignore
/// use mcqgen_rag::{EmbeddingProvider, OpenAIEmbeddingProvider};
///
/// let provider = OpenAIEmbeddingProvider::new(std::env::var("OPENAI_API_KEY")?)?
///     .with_model("text-embedding-3-large");
/// assert_eq!(provider.dimensions(), 3072);
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    /// Truncation requested from the API, if any.
    truncate_to: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for [`DEFAULT_MODEL`].
    ///
    /// # Errors
    ///
    /// [`RagError::ConfigError`] when `api_key` is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::ConfigError(format!("{PROVIDER} API key must not be empty")));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.into(),
            base_url: OPENAI_API_BASE.into(),
            truncate_to: None,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Ask the API to shorten vectors to `dims` components.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.truncate_to = Some(dims);
        self
    }

    /// Use an OpenAI-compatible server instead of `api.openai.com`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn request_embeddings(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest { model: &self.model, input: inputs, dimensions: self.truncate_to };
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| failure(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&text).map(|e| e.error.message).unwrap_or(text);
            return Err(failure(format!("API returned {status}: {detail}")));
        }

        let parsed: EmbeddingResponse =
            response.json().await.map_err(|e| failure(format!("unreadable response: {e}")))?;
        into_ordered_vectors(parsed, inputs.len())
    }
}

fn failure(message: String) -> RagError {
    error!(provider = PROVIDER, error = %message, "embedding request failed");
    RagError::EmbeddingError { provider: PROVIDER.into(), message }
}

/// Reorder by the `index` field and check that every input got a vector.
fn into_ordered_vectors(response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut data = response.data;
    data.sort_by_key(|item| item.index);
    if data.len() != expected {
        return Err(failure(format!("expected {expected} embeddings, got {}", data.len())));
    }
    Ok(data.into_iter().map(|item| item.embedding).collect())
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request_embeddings(&[text]).await?;
        vectors.pop().ok_or_else(|| failure("no embedding returned".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            debug!(provider = PROVIDER, model = %self.model, batch_size = batch.len(), "embedding batch");
            vectors.extend(self.request_embeddings(batch).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.truncate_to.unwrap_or_else(|| native_dimensions(&self.model))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
