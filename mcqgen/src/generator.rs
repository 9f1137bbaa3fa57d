//! The quiz generation orchestrator.
//!
//! [`QuizGenerator`] owns the model and embedder for one configured family.
//! An upload goes through [`QuizGenerator::process_file`] once, producing a
//! [`RetrievalIndex`]; each [`QuizGenerator::generate`] call then retrieves
//! context from that index, fills the creation prompt, invokes the model and
//! formats the result.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use mcqgen_model::{GeminiModel, Llm, LlmRequest, OpenAIClient, OpenAIConfig};
use mcqgen_rag::{
    EmbeddingProvider, FALLBACK_QUERY, GeminiEmbeddingProvider, OpenAIEmbeddingProvider, RetrievalIndex,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::config::{GeneratorConfig, InvocationStrategy, Provider};
use crate::error::{GenerationStep, GeneratorError, Result};
use crate::formatter::{FormattedQuiz, format_mcqs};
use crate::ingest::DocumentIngestor;
use crate::prompt::PromptTemplates;
use crate::refine::RefineChain;
use crate::schema::ResponseSchema;

/// Largest number of questions a single request may ask for.
pub const MAX_QUESTIONS: u32 = 100;

/// Target difficulty of the generated questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                GeneratorError::InvalidRequest(format!(
                    "unknown difficulty {wanted:?}, expected Easy, Medium or Hard"
                ))
            })
    }
}

/// Parameters of one quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRequest {
    /// Number of questions, `1..=100`.
    pub question_count: u32,
    pub subject: String,
    pub difficulty: Difficulty,
    /// Retrieval query. `None` or empty samples the document broadly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl QuizRequest {
    pub fn new(question_count: u32, subject: impl Into<String>, difficulty: Difficulty) -> Self {
        Self { question_count, subject: subject.into(), difficulty, query: None }
    }

    /// Focus retrieval on `query`.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Text sent to the retrieval index. A missing or empty query becomes
    /// [`FALLBACK_QUERY`]; whitespace-only queries pass through unchanged.
    pub fn retrieval_query(&self) -> &str {
        match self.query.as_deref() {
            Some(query) if !query.is_empty() => query,
            _ => FALLBACK_QUERY,
        }
    }

    /// Check the parameters before any retrieval happens.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::InvalidRequest`] for a question count outside
    /// `1..=100` or a blank subject.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_QUESTIONS).contains(&self.question_count) {
            return Err(GeneratorError::InvalidRequest(format!(
                "question count must be between 1 and {MAX_QUESTIONS}, got {}",
                self.question_count
            )));
        }
        if self.subject.trim().is_empty() {
            return Err(GeneratorError::InvalidRequest("subject must not be empty".into()));
        }
        Ok(())
    }
}

/// Generates quizzes from uploaded documents.
///
/// # Example
///
/// ```rust,ignore
/// use mcqgen::{GeneratorConfig, QuizGenerator, QuizRequest, Difficulty, ResponseSchema};
///
/// let generator = QuizGenerator::new(GeneratorConfig::from_env()?)?;
/// let index = generator.process_file("biology.pdf", std::fs::read("biology.pdf")?).await?;
/// let request = QuizRequest::new(5, "Biology", Difficulty::Medium).with_query("cell respiration");
/// let quiz = generator.generate(&index, &request, &ResponseSchema::builtin()?).await?;
/// println!("{quiz}");
/// ```
pub struct QuizGenerator {
    config: GeneratorConfig,
    llm: Arc<dyn Llm>,
    embedder: Arc<dyn EmbeddingProvider>,
    ingestor: DocumentIngestor,
    templates: PromptTemplates,
}

impl fmt::Debug for QuizGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizGenerator")
            .field("config", &self.config)
            .field("llm", &self.llm.name())
            .field("embedder", &self.embedder.name())
            .field("ingestor", &self.ingestor)
            .finish_non_exhaustive()
    }
}

impl QuizGenerator {
    /// Build the model and embedder for the configured family.
    ///
    /// # Errors
    ///
    /// - [`GeneratorError::MissingCredential`] when the family's API key is absent
    /// - [`GeneratorError::Config`] when a client cannot be constructed
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let key = config.require_credential()?.to_string();
        let client_error = |e: &dyn fmt::Display| GeneratorError::Config(e.to_string());

        let (llm, embedder): (Arc<dyn Llm>, Arc<dyn EmbeddingProvider>) = match config.model.provider() {
            Provider::Google => {
                let llm: Arc<dyn Llm> =
                    Arc::new(GeminiModel::new(&key, &config.gemini_model).map_err(|e| client_error(&e))?);
                let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
                    GeminiEmbeddingProvider::new(&key)
                        .map_err(|e| client_error(&e))?
                        .with_model(&config.gemini_embedding_model),
                );
                (llm, embedder)
            }
            Provider::OpenAI => {
                let llm: Arc<dyn Llm> = Arc::new(
                    OpenAIClient::new(OpenAIConfig::new(&key, config.model.id()))
                        .map_err(|e| client_error(&e))?,
                );
                let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
                    OpenAIEmbeddingProvider::new(&key)
                        .map_err(|e| client_error(&e))?
                        .with_model(&config.openai_embedding_model),
                );
                (llm, embedder)
            }
        };

        info!(model = %config.model, llm = llm.name(), embedder = embedder.name(), "quiz generator ready");
        Ok(Self::with_components(config, llm, embedder))
    }

    /// Assemble a generator from existing clients, skipping the credential check.
    pub fn with_components(
        config: GeneratorConfig,
        llm: Arc<dyn Llm>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let ingestor = DocumentIngestor::from_config(&config.rag);
        Self { config, llm, embedder, ingestor, templates: PromptTemplates::default() }
    }

    /// Replace the ingestor built from the configured chunking parameters.
    pub fn with_ingestor(mut self, ingestor: DocumentIngestor) -> Self {
        self.ingestor = ingestor;
        self
    }

    /// Replace the built-in creation and evaluation prompts.
    pub fn with_templates(mut self, templates: PromptTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Ingest an upload and index its chunks.
    ///
    /// # Errors
    ///
    /// - [`GeneratorError::UnsupportedFileType`] for anything but PDF and TXT
    /// - [`GeneratorError::Ingestion`] when parsing fails or no text is found
    /// - [`GeneratorError::Generation`] at [`GenerationStep::Retrieval`] when
    ///   embedding fails
    #[instrument(skip(self, bytes), fields(byte_count = bytes.len()))]
    pub async fn process_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<RetrievalIndex> {
        let ingestor = self.ingestor.clone();
        let name = file_name.to_string();
        let ingested = tokio::task::spawn_blocking(move || ingestor.ingest_named(&name, &bytes))
            .await
            .map_err(|e| {
                error!(file = file_name, error = %e, "ingestion task failed");
                GeneratorError::Ingestion {
                    file: file_name.to_string(),
                    message: format!("ingestion task failed: {e}"),
                }
            })?;
        // Parse failures are logged by the ingestor itself.
        let chunks = ingested.inspect_err(|e| {
            if let GeneratorError::UnsupportedFileType { extension } = e {
                error!(file = file_name, extension = %extension, "unsupported file type");
            }
        })?;

        if chunks.is_empty() {
            error!(file = file_name, "upload contains no extractable text");
            return Err(GeneratorError::Ingestion {
                file: file_name.to_string(),
                message: "no text could be extracted".into(),
            });
        }

        let chunk_count = chunks.len();
        let index = RetrievalIndex::build(chunks, Arc::clone(&self.embedder)).await.map_err(|e| {
            error!(file = file_name, error = %e, "indexing failed");
            GeneratorError::generation(GenerationStep::Retrieval, e)
        })?;

        info!(file = file_name, chunk_count, "upload indexed");
        Ok(index)
    }

    /// Generate and format a quiz from an indexed upload.
    ///
    /// The model only ever sees the retrieved chunk text, never the upload.
    ///
    /// # Errors
    ///
    /// - [`GeneratorError::InvalidRequest`] when `request` fails validation
    /// - [`GeneratorError::Schema`] when `schema` cannot be serialised
    /// - [`GeneratorError::Generation`] tagged with the failing step
    #[instrument(
        skip_all,
        fields(
            model = %self.config.model,
            questions = request.question_count,
            subject = %request.subject,
            difficulty = %request.difficulty,
        )
    )]
    pub async fn generate(
        &self,
        index: &RetrievalIndex,
        request: &QuizRequest,
        schema: &ResponseSchema,
    ) -> Result<FormattedQuiz> {
        let raw = self.generate_text(index, request, schema).await.inspect_err(|e| {
            error!(error = %e, "quiz generation failed");
        })?;

        let quiz = format_mcqs(&raw);
        info!(structured = quiz.is_structured(), question_count = quiz.question_count(), "quiz generated");
        Ok(quiz)
    }

    async fn generate_text(
        &self,
        index: &RetrievalIndex,
        request: &QuizRequest,
        schema: &ResponseSchema,
    ) -> Result<String> {
        request.validate()?;

        let hits = index
            .query(request.retrieval_query(), self.config.rag.top_k)
            .await
            .map_err(|e| GeneratorError::generation(GenerationStep::Retrieval, e))?;
        let context = hits.iter().map(|hit| hit.chunk.text.as_str()).collect::<Vec<_>>().join(" ");
        debug!(hit_count = hits.len(), context_len = context.len(), "context retrieved");

        let number = request.question_count.to_string();
        let difficulty = request.difficulty.to_string();
        let response_json = schema.to_prompt_json()?;
        let params = [
            ("number", number.as_str()),
            ("subject", request.subject.as_str()),
            ("difficulty", difficulty.as_str()),
            ("response_json", response_json.as_str()),
        ];

        let mut creation_values = vec![("text", context.as_str())];
        creation_values.extend_from_slice(&params);
        let prompt = self.templates.creation.format(&creation_values)?;

        match self.config.model.strategy() {
            InvocationStrategy::Direct => {
                let response = self
                    .llm
                    .generate(LlmRequest::new(prompt))
                    .await
                    .map_err(|e| GeneratorError::generation(GenerationStep::Invocation, e))?;
                Ok(response.text)
            }
            InvocationStrategy::Refine => {
                RefineChain::new(self.config.refine_passes)
                    .run(
                        self.llm.as_ref(),
                        &self.templates,
                        &prompt,
                        &params,
                        Some(self.config.temperature),
                    )
                    .await
            }
        }
    }
}
