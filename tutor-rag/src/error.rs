//! Error types for the `tutor-rag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval, ingestion and answering.
///
/// Most runtime provider failures never reach callers of the core
/// components: [`ResilientEmbedder`](crate::ResilientEmbedder),
/// [`VectorIndex`](crate::VectorIndex) and
/// [`CourseAssistant`](crate::CourseAssistant) convert them into sentinel
/// values and log them. These variants surface from the provider traits and
/// from construction-time operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A source document could not be extracted.
    #[error("Failed to load '{path}': {message}")]
    Loader {
        /// Path of the offending file.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// The chat-completion provider failed.
    #[error("Model error ({provider}): {message}")]
    Model {
        /// The chat provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
