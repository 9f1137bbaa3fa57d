//! Gemini embedding provider using the Generative Language REST API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default Gemini embedding model.
pub const DEFAULT_MODEL: &str = "gemini-embedding-001";

/// Full output size of a Gemini embedding model.
fn native_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-004" | "embedding-001" => 768,
        _ => 3072,
    }
}

/// `batchEmbedContents` accepts at most this many requests per call.
const MAX_BATCH_SIZE: usize = 100;

/// How the embedding will be used; Gemini tunes vectors per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Text that will be searched over.
    RetrievalDocument,
    /// A search query.
    RetrievalQuery,
}

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// Chunks are embedded with [`TaskType::RetrievalDocument`] through
/// `batchEmbedContents`, split into requests of at most 100 texts. Queries
/// use `embedContent` with [`TaskType::RetrievalQuery`].
///
/// # Example
///
/// ```rust,ignore
/// use mcqgen_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::new(std::env::var("GOOGLE_API_KEY")?)?;
/// let embedding = provider.embed_query("cell biology").await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    /// Truncation requested through `outputDimensionality`, if any.
    output_dimensionality: Option<usize>,
}

impl GeminiEmbeddingProvider {
    /// Create a new provider using the given API key and [`DEFAULT_MODEL`].
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::ConfigError("Gemini API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.into(),
            base_url: GEMINI_API_BASE.into(),
            output_dimensionality: None,
        })
    }

    /// Set the embedding model name, with or without the `models/` prefix.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = model.strip_prefix("models/").map(str::to_string).unwrap_or(model);
        self
    }

    /// Ask the API to truncate vectors to `dims` components.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.output_dimensionality = Some(dims);
        self
    }

    /// Point the provider at a different API root, e.g. a proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn model_path(&self) -> String {
        format!("models/{}", self.model)
    }

    fn request<'a>(&'a self, model: &'a str, text: &'a str, task_type: TaskType) -> EmbedRequest<'a> {
        EmbedRequest {
            model,
            content: Content { parts: vec![Part { text }] },
            task_type,
            output_dimensionality: self.output_dimensionality,
        }
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}/{}:{method}", self.base_url, self.model_path());
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Gemini", error = %e, "request failed");
                RagError::EmbeddingError {
                    provider: "Gemini".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "Gemini", %status, method, "API error");
            return Err(RagError::EmbeddingError {
                provider: "Gemini".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        response.json().await.map_err(|e| {
            error!(provider = "Gemini", error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: "Gemini".into(),
                message: format!("failed to parse response: {e}"),
            }
        })
    }

    async fn embed_with_task(&self, text: &str, task_type: TaskType) -> Result<Vec<f32>> {
        let model = self.model_path();
        let response: EmbedResponse =
            self.post("embedContent", &self.request(&model, text, task_type)).await?;
        Ok(response.embedding.values)
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "Gemini", text_len = text.len(), "embedding single text");
        self.embed_with_task(text, TaskType::RetrievalDocument).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model_path();
        let mut results = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH_SIZE) {
            debug!(provider = "Gemini", batch_size = batch.len(), model = %self.model, "embedding batch");

            let body = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|text| self.request(&model, text, TaskType::RetrievalDocument))
                    .collect(),
            };
            let response: BatchEmbedResponse = self.post("batchEmbedContents", &body).await?;

            if response.embeddings.len() != batch.len() {
                return Err(RagError::EmbeddingError {
                    provider: "Gemini".into(),
                    message: format!(
                        "expected {} embeddings, API returned {}",
                        batch.len(),
                        response.embeddings.len()
                    ),
                });
            }
            results.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(results)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "Gemini", text_len = text.len(), "embedding query");
        self.embed_with_task(text, TaskType::RetrievalQuery).await
    }

    fn dimensions(&self) -> usize {
        self.output_dimensionality.unwrap_or_else(|| native_dimensions(&self.model))
    }

    fn name(&self) -> &str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_api_key() {
        assert!(GeminiEmbeddingProvider::new("  ").is_err());
    }

    #[test]
    fn model_prefix_is_normalised() {
        let provider = GeminiEmbeddingProvider::new("key").unwrap().with_model("models/embedding-001");
        assert_eq!(provider.model_path(), "models/embedding-001");
    }

    #[test]
    fn batch_request_uses_camel_case_and_task_type() {
        let provider = GeminiEmbeddingProvider::new("key").unwrap();
        let model = provider.model_path();
        let body = BatchEmbedRequest {
            requests: vec![provider.request(&model, "photosynthesis", TaskType::RetrievalDocument)],
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["requests"][0]["model"], "models/gemini-embedding-001");
        assert_eq!(json["requests"][0]["taskType"], "RETRIEVAL_DOCUMENT");
        assert_eq!(json["requests"][0]["content"]["parts"][0]["text"], "photosynthesis");
        assert!(json["requests"][0].get("outputDimensionality").is_none());
    }

    #[test]
    fn dimensions_follow_model_unless_truncated() {
        let provider = GeminiEmbeddingProvider::new("key").unwrap();
        assert_eq!(provider.dimensions(), 3072);

        let legacy = GeminiEmbeddingProvider::new("key").unwrap().with_model("models/text-embedding-004");
        assert_eq!(legacy.dimensions(), 768);

        let truncated = GeminiEmbeddingProvider::new("key").unwrap().with_dimensions(256);
        assert_eq!(truncated.dimensions(), 256);
        let model = truncated.model_path();
        let json = serde_json::to_value(truncated.request(&model, "x", TaskType::RetrievalQuery)).unwrap();
        assert_eq!(json["outputDimensionality"], 256);
    }

    #[test]
    fn batch_response_parses_values() {
        let response: BatchEmbedResponse =
            serde_json::from_str(r#"{"embeddings":[{"values":[0.1,0.2]},{"values":[0.3,0.4]}]}"#)
                .unwrap();
        assert_eq!(response.embeddings.len(), 2);
        assert_eq!(response.embeddings[1].values, vec![0.3, 0.4]);
    }
}
