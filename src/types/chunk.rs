//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded segment of a source document, the unit of retrieval
///
/// Chunks are immutable once indexed; index structures reference them by id
/// and never mutate them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// The document this chunk belongs to
    pub document_id: Uuid,
    /// Original filename, carried for citations
    pub filename: String,
    /// Position of this chunk within its document
    pub chunk_index: u32,
    /// Chunk text
    pub content: String,
}

impl Chunk {
    /// Create a new chunk with a generated ID
    pub fn new(
        document_id: Uuid,
        filename: impl Into<String>,
        chunk_index: u32,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            filename: filename.into(),
            chunk_index,
            content: content.into(),
        }
    }
}

/// A document that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Original filename as supplied by the caller
    pub filename: String,
    /// Content hash for deduplication
    pub content_hash: String,
    /// Number of chunks that survived validation and were indexed
    pub total_chunks: u32,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record
    pub fn new(filename: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            content_hash: content_hash.into(),
            total_chunks: 0,
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// Which retrieval channel produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalSource {
    /// BM25 keyword search
    Keyword,
    /// Vector similarity search
    Vector,
    /// Combined keyword + vector score
    Fused,
}

impl std::fmt::Display for RetrievalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalSource::Keyword => write!(f, "keyword"),
            RetrievalSource::Vector => write!(f, "vector"),
            RetrievalSource::Fused => write!(f, "fused"),
        }
    }
}

/// A chunk retrieved for one query, with score provenance
///
/// Ephemeral: created per query, never persisted.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Relevance score (channel-specific before fusion, combined after)
    pub score: f32,
    /// Which channel produced this score
    pub source: RetrievalSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_are_unique() {
        let doc = Uuid::new_v4();
        let a = Chunk::new(doc, "a.txt", 0, "alpha");
        let b = Chunk::new(doc, "a.txt", 1, "beta");
        assert_ne!(a.id, b.id);
        assert_eq!(a.document_id, b.document_id);
    }

    #[test]
    fn retrieval_source_display() {
        assert_eq!(format!("{}", RetrievalSource::Keyword), "keyword");
        assert_eq!(format!("{}", RetrievalSource::Vector), "vector");
        assert_eq!(format!("{}", RetrievalSource::Fused), "fused");
    }
}
