//! Error types for the retrieval pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
///
/// Failures with a safe synthetic substitute (routing, grading) are absorbed
/// by their component and never escape it; the remaining kinds surface as a
/// failed run with a reason string.
#[derive(Debug, Error)]
pub enum Error {
    /// Query routing error (absorbed by the router's Hybrid fallback)
    #[error("Routing error: {0}")]
    Routing(String),

    /// Keyword index error
    #[error("Index error: {0}")]
    Index(String),

    /// Relevance grading error (absorbed: treated as insufficient)
    #[error("Grading error: {0}")]
    Grading(String),

    /// Answer generation failed; fatal to the owning run
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Generated content failed the safety check; content is withheld
    #[error("Content withheld: {0}")]
    SafetyViolation(String),

    /// A chunk failed ingestion validation (skipped, document continues)
    #[error("Invalid chunk {chunk_index}: {reason}")]
    ChunkInvalid { chunk_index: u32, reason: String },

    /// No chunks survived ingestion validation
    #[error("Ingestion produced no indexable chunks: {0}")]
    EmptyIngest(String),

    /// Checkpoint store error
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// An external call exceeded its per-step timeout
    #[error("Timeout after {0}s in {1}")]
    Timeout(u64, &'static str),

    /// Vector search collaborator error
    #[error("Vector search error: {0}")]
    VectorSearch(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create a vector search error
    pub fn vector_search(message: impl Into<String>) -> Self {
        Self::VectorSearch(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
