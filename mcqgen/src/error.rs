//! Error types for quiz generation.

use std::fmt;

use thiserror::Error;

/// The pipeline step a [`GeneratorError::Generation`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStep {
    /// Embedding the uploaded chunks or querying the index.
    Retrieval,
    /// Filling a prompt template.
    Prompt,
    /// A direct model call.
    Invocation,
    /// A pass of the refine chain.
    Refine,
}

impl fmt::Display for GenerationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Retrieval => "retrieval",
            Self::Prompt => "prompt",
            Self::Invocation => "model invocation",
            Self::Refine => "refine chain",
        })
    }
}

/// Errors returned by the quiz generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The upload's extension is neither `pdf` nor `txt`.
    #[error("Unsupported file type {extension:?}. Please upload a PDF or TXT file.")]
    UnsupportedFileType {
        /// The extension as given, without the leading dot.
        extension: String,
    },

    /// Writing, parsing or chunking the upload failed.
    #[error("Error loading file {file}: {message}")]
    Ingestion {
        /// The uploaded file name.
        file: String,
        /// The underlying failure.
        message: String,
    },

    /// The model identifier is not one of the supported families.
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    /// The API key for the selected model family is absent.
    #[error("Missing credential: set {variable} to use {model}")]
    MissingCredential {
        /// Environment variable that would provide the key.
        variable: &'static str,
        /// The selected model family.
        model: String,
    },

    /// Retrieval, prompting or a model call failed.
    #[error("Error generating MCQs during {step}: {message}")]
    Generation {
        /// Where the failure happened.
        step: GenerationStep,
        /// The underlying failure.
        message: String,
    },

    /// Inconsistent configuration values.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Quiz parameters outside the accepted ranges.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The response schema exemplar could not be read or has the wrong shape.
    #[error("Invalid response schema: {0}")]
    Schema(String),
}

impl GeneratorError {
    /// Wrap any displayable failure as a [`GeneratorError::Generation`].
    pub fn generation(step: GenerationStep, err: impl fmt::Display) -> Self {
        Self::Generation { step, message: err.to_string() }
    }
}

/// A convenience result type for quiz generation.
pub type Result<T> = std::result::Result<T, GeneratorError>;
