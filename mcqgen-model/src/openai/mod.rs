//! OpenAI chat completions via `async-openai`.
//!
//! The GPT-3.5 Turbo, GPT-4 and GPT-4 Turbo families are all served by
//! [`OpenAIClient`]; only the model name differs.

mod client;
mod config;

pub use client::OpenAIClient;
pub use config::OpenAIConfig;
