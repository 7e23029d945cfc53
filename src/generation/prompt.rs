//! Prompt templates for grounded answer generation

use crate::types::{Citation, RetrievedChunk};

/// System prompt for the answer-generation call
pub const GENERATION_SYSTEM_PROMPT: &str =
    "You are a document-grounded assistant. You only use information from the provided context.";

/// Builds the grounded generation prompt from retrieved context
pub struct PromptBuilder;

impl PromptBuilder {
    /// Render retrieved chunks as numbered context blocks
    pub fn build_context(results: &[RetrievedChunk]) -> String {
        let mut context = String::new();

        for (i, result) in results.iter().enumerate() {
            context.push_str(&format!(
                "[{}] {}, chunk {}\n\nContent:\n{}\n\n---\n\n",
                i + 1,
                result.chunk.filename,
                result.chunk.chunk_index,
                result.chunk.content
            ));
        }

        context
    }

    /// Build the full grounded prompt
    pub fn build_rag_prompt(question: &str, context: &str, citations: &[Citation]) -> String {
        format!(
            r#"You are answering from documents. Follow these rules exactly:
1. ONLY use information explicitly stated in the CONTEXT below.
2. If the answer is not in the context, respond with "This information is not available in the provided documents."
3. Never use external knowledge or make inferences beyond what is stated.
4. Cite every claim inline in this format: [Source: filename, chunk N]
5. If multiple sources support a point, cite all of them.

CONTEXT FROM DOCUMENTS:
{context}

AVAILABLE SOURCES:
{sources}

QUESTION: {question}

Provide a grounded answer using ONLY the document content above:"#,
            context = context,
            sources = Self::format_sources_list(citations),
            question = question
        )
    }

    fn format_sources_list(citations: &[Citation]) -> String {
        citations
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] {}, chunk {}", i + 1, c.filename, c.chunk_index))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, RetrievalSource};
    use uuid::Uuid;

    #[test]
    fn context_numbers_chunks_with_provenance() {
        let results = vec![RetrievedChunk {
            chunk: Chunk::new(Uuid::new_v4(), "physics.txt", 2, "Gravity attracts."),
            score: 1.0,
            source: RetrievalSource::Fused,
        }];

        let context = PromptBuilder::build_context(&results);
        assert!(context.contains("[1] physics.txt, chunk 2"));
        assert!(context.contains("Gravity attracts."));
    }

    #[test]
    fn prompt_embeds_question_and_sources() {
        let results = vec![RetrievedChunk {
            chunk: Chunk::new(Uuid::new_v4(), "physics.txt", 0, "Gravity attracts."),
            score: 1.0,
            source: RetrievalSource::Fused,
        }];
        let citations: Vec<Citation> =
            results.iter().map(|r| Citation::from_retrieved(r, 200)).collect();
        let context = PromptBuilder::build_context(&results);

        let prompt = PromptBuilder::build_rag_prompt("what is gravity?", &context, &citations);
        assert!(prompt.contains("QUESTION: what is gravity?"));
        assert!(prompt.contains("[1] physics.txt, chunk 0"));
    }
}
