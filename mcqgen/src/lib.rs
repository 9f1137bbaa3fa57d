//! # mcqgen
//!
//! Multiple-choice quiz generation from PDF and text documents.
//!
//! ## Overview
//!
//! - [`DocumentIngestor`] writes an upload to a temporary file, extracts its
//!   text and splits it into chunks
//! - [`QuizGenerator`] indexes those chunks, retrieves the most relevant ones
//!   for a [`QuizRequest`], fills the creation prompt and calls the model,
//!   directly for Gemini or through a [`RefineChain`] for the OpenAI families
//! - [`format_mcqs`] renders the model's JSON as plain text, falling back to
//!   the raw output when it cannot be parsed
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mcqgen::{Difficulty, GeneratorConfig, QuizGenerator, QuizRequest, ResponseSchema};
//!
//! let generator = QuizGenerator::new(GeneratorConfig::from_env()?)?;
//! let index = generator.process_file("notes.txt", std::fs::read("notes.txt")?).await?;
//! let quiz = generator
//!     .generate(&index, &QuizRequest::new(5, "Biology", Difficulty::Easy), &ResponseSchema::builtin()?)
//!     .await?;
//! print!("{quiz}");
//! ```

pub mod config;
pub mod error;
pub mod formatter;
pub mod generator;
pub mod ingest;
pub mod prompt;
pub mod refine;
pub mod schema;

pub use config::{
    GeneratorConfig, GeneratorConfigBuilder, InvocationStrategy, ModelFamily, Provider,
};
pub use error::{GenerationStep, GeneratorError, Result};
pub use formatter::{FormattedQuiz, RenderedQuestion, format_mcqs};
pub use generator::{Difficulty, MAX_QUESTIONS, QuizGenerator, QuizRequest};
pub use ingest::{DocumentIngestor, DocumentLoader, FileKind, FsDocumentLoader, LoadError};
pub use prompt::{PromptTemplate, PromptTemplates};
pub use refine::{RefineChain, RefineStep};
pub use schema::{McqItem, ResponseSchema};
