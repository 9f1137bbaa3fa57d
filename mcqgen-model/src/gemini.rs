//! Gemini text generation over the `generateContent` REST endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{ModelError, Result};
use crate::llm::{Llm, LlmRequest, LlmResponse};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A Gemini model called directly with a single prompt.
///
/// ```rust,no_run
/// use mcqgen_model::GeminiModel;
///
/// let model = GeminiModel::new("api-key", "gemini-2.5-flash").unwrap();
/// ```
pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiModel {
    /// Create a client for `model` (e.g. `gemini-2.5-flash`).
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ModelError::Config("Gemini API key must not be empty".into()));
        }
        let model = model.into();
        let model = model.strip_prefix("models/").map(str::to_string).unwrap_or(model);

        Ok(Self { client: reqwest::Client::new(), api_key, model, base_url: GEMINI_API_BASE.into() })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn build_request(request: &LlmRequest) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![RequestPart { text: &request.prompt }],
        }],
        generation_config: request.temperature.map(|temperature| GenerationConfig { temperature }),
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<LlmResponse> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::EmptyResponse { provider: "Gemini".into() })?;

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ModelError::EmptyResponse { provider: "Gemini".into() });
    }
    Ok(LlmResponse { text, finish_reason: candidate.finish_reason })
}

#[async_trait]
impl Llm for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        debug!(provider = "Gemini", model = %self.model, prompt_len = request.prompt.len(), "generateContent");

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(&request))
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Gemini", error = %e, "request failed");
                ModelError::Request { provider: "Gemini".into(), message: e.to_string() }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = "Gemini", %status, "API error");
            return Err(ModelError::Request {
                provider: "Gemini".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            error!(provider = "Gemini", error = %e, "failed to parse response");
            ModelError::BadResponse { provider: "Gemini".into(), message: e.to_string() }
        })?;

        extract_text(body)
    }
}
