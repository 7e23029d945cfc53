//! Query answer and citation types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chunk::RetrievedChunk;

/// A source citation attached to an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// The chunk the citation points at
    pub chunk_id: Uuid,
    /// The chunk's document
    pub document_id: Uuid,
    /// Filename for display
    pub filename: String,
    /// Chunk position within its document
    pub chunk_index: u32,
    /// Short excerpt of the cited chunk
    pub snippet: String,
    /// Fused relevance score of the chunk at generation time
    pub score: f32,
}

impl Citation {
    /// Build a citation from a retrieved chunk, truncating the snippet at a
    /// word boundary.
    pub fn from_retrieved(retrieved: &RetrievedChunk, max_snippet_len: usize) -> Self {
        Self {
            chunk_id: retrieved.chunk.id,
            document_id: retrieved.chunk.document_id,
            filename: retrieved.chunk.filename.clone(),
            chunk_index: retrieved.chunk.chunk_index,
            snippet: truncate_snippet(&retrieved.chunk.content, max_snippet_len),
            score: retrieved.score,
        }
    }

    /// Format for inline display: "filename (chunk N)"
    pub fn format_inline(&self) -> String {
        format!("{} (chunk {})", self.filename, self.chunk_index)
    }
}

/// Final, well-formed result of a query run: an answer with citations
///
/// The pipeline either returns this or a failure reason; never a half-built
/// answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// The run that produced this answer
    pub run_id: Uuid,
    /// Generated answer text
    pub answer: String,
    /// Chunks the answer is grounded on
    pub citations: Vec<Citation>,
    /// Corrective retrieval retries used before generating
    pub retries_used: u32,
}

/// Truncate a snippet to a maximum length while preserving word boundaries
pub fn truncate_snippet(snippet: &str, max_len: usize) -> String {
    if snippet.len() <= max_len {
        return snippet.to_string();
    }

    let mut end = max_len;
    while end > 0 && !snippet.is_char_boundary(end) {
        end -= 1;
    }

    if let Some(pos) = snippet[..end].rfind(' ') {
        return format!("{}...", &snippet[..pos]);
    }

    format!("{}...", &snippet[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::chunk::{Chunk, RetrievalSource};

    #[test]
    fn truncate_preserves_short_snippets() {
        assert_eq!(truncate_snippet("short", 20), "short");
    }

    #[test]
    fn truncate_ends_at_word_boundary() {
        let long = "This is a very long snippet that needs to be truncated.";
        let truncated = truncate_snippet(long, 20);
        assert!(truncated.len() <= 23);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn citation_from_retrieved_carries_provenance() {
        let chunk = Chunk::new(Uuid::new_v4(), "physics.txt", 3, "Gravity is a force.");
        let retrieved = RetrievedChunk {
            chunk: chunk.clone(),
            score: 0.82,
            source: RetrievalSource::Fused,
        };
        let citation = Citation::from_retrieved(&retrieved, 200);
        assert_eq!(citation.chunk_id, chunk.id);
        assert_eq!(citation.filename, "physics.txt");
        assert_eq!(citation.chunk_index, 3);
        assert!((citation.score - 0.82).abs() < 1e-6);
        assert_eq!(citation.format_inline(), "physics.txt (chunk 3)");
    }
}
