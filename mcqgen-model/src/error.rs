//! Error types for the `mcqgen-model` crate.

use thiserror::Error;

/// Errors returned by language model clients.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The request could not be built or sent, or the upstream service rejected it.
    #[error("{provider} request failed: {message}")]
    Request {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The service answered with a body that could not be understood.
    #[error("{provider} returned a malformed response: {message}")]
    BadResponse {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The service answered without any generated text.
    #[error("{provider} returned no text")]
    EmptyResponse {
        /// The provider that produced the error.
        provider: String,
    },

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
