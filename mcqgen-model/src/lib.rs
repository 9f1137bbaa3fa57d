//! # mcqgen-model
//!
//! Language model clients used to generate quizzes.
//!
//! ## Overview
//!
//! Every client implements the single-turn [`Llm`] trait:
//!
//! - [`GeminiModel`] - Google Gemini over the `generateContent` REST endpoint
//! - [`OpenAIClient`] - OpenAI chat completions (GPT-3.5 Turbo, GPT-4, GPT-4 Turbo)
//! - [`MockLlm`] - scripted replies for testing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mcqgen_model::{Llm, LlmRequest, OpenAIClient, OpenAIConfig};
//!
//! let model = OpenAIClient::new(OpenAIConfig::new(
//!     std::env::var("OPENAI_API_KEY")?,
//!     "gpt-4-turbo",
//! ))?;
//! let reply = model.generate(LlmRequest::new(prompt).with_temperature(0.5)).await?;
//! ```

pub mod error;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod llm;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

pub use error::{ModelError, Result};
#[cfg(feature = "gemini")]
pub use gemini::GeminiModel;
pub use llm::{Llm, LlmRequest, LlmResponse};
pub use mock::MockLlm;
#[cfg(feature = "openai")]
pub use openai::{OpenAIClient, OpenAIConfig};
