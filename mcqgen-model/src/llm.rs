//! The language model seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single-turn completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The fully rendered prompt.
    pub prompt: String,
    /// Sampling temperature; `None` leaves the provider default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// Create a request with the provider's default temperature.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), temperature: None }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// The text a model produced for an [`LlmRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated text.
    pub text: String,
    /// Provider-specific finish reason, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl LlmResponse {
    /// Create a response with no finish reason.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), finish_reason: None }
    }
}

/// A hosted or local model that turns a prompt into text.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Model name, used in logs.
    fn name(&self) -> &str;

    /// Run one completion.
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse>;
}
