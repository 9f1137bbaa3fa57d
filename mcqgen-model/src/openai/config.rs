//! OpenAI client configuration.

use serde::{Deserialize, Serialize};

/// Credentials and chat model for [`OpenAIClient`](super::OpenAIClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Chat model, e.g. `gpt-4-turbo`.
    pub model: String,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), model: model.into() }
    }
}
