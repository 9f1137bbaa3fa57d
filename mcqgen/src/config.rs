//! Generator configuration and model family dispatch.

use std::fmt;
use std::str::FromStr;

use mcqgen_rag::RagConfig;
use mcqgen_rag::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, Result};

/// Default Gemini generation model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini embedding model.
pub const DEFAULT_GEMINI_EMBEDDING_MODEL: &str = mcqgen_rag::gemini::DEFAULT_MODEL;

/// Default OpenAI embedding model.
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = mcqgen_rag::openai::DEFAULT_MODEL;

/// Sampling temperature for the OpenAI families.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Environment variables read by [`GeneratorConfigBuilder::from_lookup`].
pub mod env {
    pub const MODEL: &str = "MCQGEN_MODEL";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
    pub const GEMINI_MODEL: &str = "MCQGEN_GEMINI_MODEL";
    pub const TOP_K: &str = "MCQGEN_TOP_K";
    pub const REFINE_PASSES: &str = "MCQGEN_REFINE_PASSES";
}

/// The supported model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    /// Google Gemini, invoked directly.
    #[serde(rename = "google")]
    GoogleGenerative,
    /// OpenAI `gpt-3.5-turbo`.
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    /// OpenAI `gpt-4`.
    #[serde(rename = "gpt-4")]
    Gpt4,
    /// OpenAI `gpt-4-turbo`.
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,
}

/// How a family turns the filled prompt into quiz text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStrategy {
    /// One completion call with the filled prompt.
    Direct,
    /// A [`RefineChain`](crate::RefineChain) over the filled prompt.
    Refine,
}

/// The service behind a model family, which also supplies its embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    OpenAI,
}

impl Provider {
    /// Environment variable holding this provider's API key.
    pub fn credential_variable(self) -> &'static str {
        match self {
            Self::Google => env::GOOGLE_API_KEY,
            Self::OpenAI => env::OPENAI_API_KEY,
        }
    }
}

impl ModelFamily {
    /// Every supported family, in display order.
    pub const ALL: [ModelFamily; 4] =
        [Self::GoogleGenerative, Self::Gpt35Turbo, Self::Gpt4, Self::Gpt4Turbo];

    /// Stable identifier, e.g. `gpt-4-turbo`.
    pub fn id(self) -> &'static str {
        match self {
            Self::GoogleGenerative => "google",
            Self::Gpt35Turbo => "gpt-3.5-turbo",
            Self::Gpt4 => "gpt-4",
            Self::Gpt4Turbo => "gpt-4-turbo",
        }
    }

    /// Human-readable label, e.g. `GPT-4 Turbo`.
    pub fn label(self) -> &'static str {
        match self {
            Self::GoogleGenerative => "Google Gemini",
            Self::Gpt35Turbo => "GPT-3.5 Turbo",
            Self::Gpt4 => "GPT-4",
            Self::Gpt4Turbo => "GPT-4 Turbo",
        }
    }

    pub fn strategy(self) -> InvocationStrategy {
        match self {
            Self::GoogleGenerative => InvocationStrategy::Direct,
            Self::Gpt35Turbo | Self::Gpt4 | Self::Gpt4Turbo => InvocationStrategy::Refine,
        }
    }

    pub fn provider(self) -> Provider {
        match self {
            Self::GoogleGenerative => Provider::Google,
            Self::Gpt35Turbo | Self::Gpt4 | Self::Gpt4Turbo => Provider::OpenAI,
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModelFamily {
    type Err = GeneratorError;

    /// Accepts the identifier or the label, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|family| {
                family.id().eq_ignore_ascii_case(wanted) || family.label().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| GeneratorError::UnsupportedModel(wanted.to_string()))
    }
}

/// Everything [`QuizGenerator`](crate::QuizGenerator) needs to know up front.
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Selected model family.
    pub model: ModelFamily,
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
    /// Gemini model used for generation.
    pub gemini_model: String,
    pub gemini_embedding_model: String,
    pub openai_embedding_model: String,
    /// Chunk size, overlap and retrieval depth.
    pub rag: RagConfig,
    /// Sampling temperature for the OpenAI families.
    pub temperature: f32,
    /// Evaluation passes run after the initial refine-chain step.
    pub refine_passes: usize,
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("GeneratorConfig")
            .field("model", &self.model)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("google_api_key", &redact(&self.google_api_key))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_embedding_model", &self.gemini_embedding_model)
            .field("openai_embedding_model", &self.openai_embedding_model)
            .field("rag", &self.rag)
            .field("temperature", &self.temperature)
            .field("refine_passes", &self.refine_passes)
            .finish()
    }
}

impl GeneratorConfig {
    /// Create a new builder for constructing a [`GeneratorConfig`].
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::default()
    }

    /// Build a configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        GeneratorConfigBuilder::from_env()?.build()
    }

    /// The API key for the selected family.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::MissingCredential`] naming the variable when the key
    /// is absent or blank.
    pub fn require_credential(&self) -> Result<&str> {
        let provider = self.model.provider();
        let key = match provider {
            Provider::Google => self.google_api_key.as_deref(),
            Provider::OpenAI => self.openai_api_key.as_deref(),
        };
        key.map(str::trim).filter(|key| !key.is_empty()).ok_or_else(|| {
            GeneratorError::MissingCredential {
                variable: provider.credential_variable(),
                model: self.model.label().to_string(),
            }
        })
    }
}

/// Builder for a validated [`GeneratorConfig`].
#[derive(Clone)]
pub struct GeneratorConfigBuilder {
    model: String,
    openai_api_key: Option<String>,
    google_api_key: Option<String>,
    gemini_model: String,
    gemini_embedding_model: String,
    openai_embedding_model: String,
    chunk_size: usize,
    chunk_overlap: usize,
    top_k: usize,
    temperature: f32,
    refine_passes: usize,
}

impl fmt::Debug for GeneratorConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("GeneratorConfigBuilder")
            .field("model", &self.model)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("google_api_key", &redact(&self.google_api_key))
            .field("gemini_model", &self.gemini_model)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("top_k", &self.top_k)
            .field("temperature", &self.temperature)
            .field("refine_passes", &self.refine_passes)
            .finish_non_exhaustive()
    }
}

impl Default for GeneratorConfigBuilder {
    fn default() -> Self {
        Self {
            model: ModelFamily::GoogleGenerative.id().to_string(),
            openai_api_key: None,
            google_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_embedding_model: DEFAULT_GEMINI_EMBEDDING_MODEL.to_string(),
            openai_embedding_model: DEFAULT_OPENAI_EMBEDDING_MODEL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            temperature: DEFAULT_TEMPERATURE,
            refine_passes: 0,
        }
    }
}

impl GeneratorConfigBuilder {
    /// Start from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Start from values supplied by `lookup`, which maps a variable name to
    /// its value. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::Config`] when a numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let parse = |key: &str| -> Result<Option<usize>> {
            get(key)
                .map(|value| {
                    value.trim().parse::<usize>().map_err(|e| {
                        GeneratorError::Config(format!("{key}={value:?} is not a valid count: {e}"))
                    })
                })
                .transpose()
        };

        let mut builder = Self::default();
        if let Some(model) = get(env::MODEL) {
            builder.model = model;
        }
        builder.openai_api_key = get(env::OPENAI_API_KEY);
        builder.google_api_key = get(env::GOOGLE_API_KEY);
        if let Some(gemini_model) = get(env::GEMINI_MODEL) {
            builder.gemini_model = gemini_model;
        }
        if let Some(top_k) = parse(env::TOP_K)? {
            builder.top_k = top_k;
        }
        if let Some(passes) = parse(env::REFINE_PASSES)? {
            builder.refine_passes = passes;
        }
        Ok(builder)
    }

    /// Select the model family by identifier or label.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    pub fn google_api_key(mut self, key: impl Into<String>) -> Self {
        self.google_api_key = Some(key.into());
        self
    }

    pub fn gemini_model(mut self, model: impl Into<String>) -> Self {
        self.gemini_model = model.into();
        self
    }

    pub fn gemini_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.gemini_embedding_model = model.into();
        self
    }

    pub fn openai_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.openai_embedding_model = model.into();
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn refine_passes(mut self, passes: usize) -> Self {
        self.refine_passes = passes;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// - [`GeneratorError::UnsupportedModel`] for an unknown model
    /// - [`GeneratorError::Config`] for inconsistent chunking parameters or a
    ///   temperature outside `0.0..=2.0`
    pub fn build(self) -> Result<GeneratorConfig> {
        let model: ModelFamily = self.model.parse()?;

        let rag = RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .build()
            .map_err(|e| GeneratorError::Config(e.to_string()))?;

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(GeneratorError::Config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        Ok(GeneratorConfig {
            model,
            openai_api_key: self.openai_api_key,
            google_api_key: self.google_api_key,
            gemini_model: self.gemini_model,
            gemini_embedding_model: self.gemini_embedding_model,
            openai_embedding_model: self.openai_embedding_model,
            rag,
            temperature: self.temperature,
            refine_passes: self.refine_passes,
        })
    }
}
