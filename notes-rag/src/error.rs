//! Error types for the `notes-rag` crate.

use thiserror::Error;

/// Errors that can occur while building the index or answering a question.
#[derive(Debug, Error)]
pub enum RagError {
    /// The credential required by the answer generator is not set.
    #[error("Missing credential: environment variable {variable} is not set")]
    MissingCredential {
        /// The environment variable that was consulted.
        variable: String,
    },

    /// The notes file could not be found at the configured path.
    #[error("Notes file not found: {path}")]
    NotesFileNotFound {
        /// The path that was tried.
        path: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The embedding backend could not be loaded or reached.
    #[error("Embedding model unavailable ({provider}): {message}")]
    ModelUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The language-model service failed, timed out, or refused the request.
    #[error("Answer service unavailable ({provider}): {message}")]
    ServiceUnavailable {
        /// The generation backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The index holds no entries, either because it was never built or
    /// because the notes produced zero chunks.
    #[error("Vector index is empty: the notes produced no searchable chunks")]
    EmptyIndex,

    /// A vector did not have the dimension the index was built with.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension of the index.
        expected: usize,
        /// The dimension that was supplied.
        actual: usize,
    },

    /// A caller supplied an argument the operation cannot use.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The persisted index could not be read or written.
    #[error("Index store error ({path}): {message}")]
    IndexStoreError {
        /// The file or directory involved.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// An I/O error not covered by a more specific variant.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Whether this error is a fatal configuration problem (missing credential,
    /// missing notes file, invalid settings) rather than a per-call failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RagError::MissingCredential { .. }
                | RagError::NotesFileNotFound { .. }
                | RagError::ConfigError(_)
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
