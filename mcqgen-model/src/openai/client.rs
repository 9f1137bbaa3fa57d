//! OpenAI client implementation.

use async_openai::{
    Client,
    config::OpenAIConfig as AsyncOpenAIConfig,
    types::{
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use tracing::{debug, error};

use super::config::OpenAIConfig;
use crate::error::{ModelError, Result};
use crate::llm::{Llm, LlmRequest, LlmResponse};

/// OpenAI chat completions client.
pub struct OpenAIClient {
    client: Client<AsyncOpenAIConfig>,
    model: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ModelError::Config("OpenAI API key must not be empty".into()));
        }

        let openai_config = AsyncOpenAIConfig::new().with_api_key(&config.api_key);
        Ok(Self { client: Client::with_config(openai_config), model: config.model })
    }
}

fn build_request(model: &str, request: &LlmRequest) -> Result<CreateChatCompletionRequest> {
    let bad_request = |e: async_openai::error::OpenAIError| ModelError::Request {
        provider: "OpenAI".into(),
        message: format!("failed to build request: {e}"),
    };

    let message = ChatCompletionRequestUserMessageArgs::default()
        .content(request.prompt.as_str())
        .build()
        .map_err(bad_request)?;

    let mut builder = CreateChatCompletionRequestArgs::default();
    builder.model(model).messages(vec![message.into()]);
    if let Some(temperature) = request.temperature {
        builder.temperature(temperature);
    }
    builder.build().map_err(bad_request)
}

fn extract_text(response: CreateChatCompletionResponse) -> Result<LlmResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::EmptyResponse { provider: "OpenAI".into() })?;

    let text = choice
        .message
        .content
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ModelError::EmptyResponse { provider: "OpenAI".into() })?;

    Ok(LlmResponse {
        text,
        finish_reason: choice.finish_reason.map(|reason| format!("{reason:?}")),
    })
}

#[async_trait]
impl Llm for OpenAIClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        debug!(
            provider = "OpenAI",
            model = %self.model,
            prompt_len = request.prompt.len(),
            temperature = ?request.temperature,
            "chat completion"
        );

        let openai_request = build_request(&self.model, &request)?;
        let response = self.client.chat().create(openai_request).await.map_err(|e| {
            error!(provider = "OpenAI", error = %e, "chat completion failed");
            ModelError::Request { provider: "OpenAI".into(), message: e.to_string() }
        })?;

        extract_text(response)
    }
}
