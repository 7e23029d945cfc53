//! Sentence-aware text chunking with configurable size and overlap

use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::types::Chunk;

/// Splits document text into overlapping chunks on sentence boundaries
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks
    overlap: usize,
    /// Chunks shorter than this are merged forward or dropped
    min_size: usize,
}

impl TextChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
            min_size: config.min_chunk_size,
        }
    }

    /// Chunk document text, assigning sequential chunk indexes
    ///
    /// Sentences are never split unless a single sentence exceeds the
    /// chunk size on its own. A trailing fragment shorter than the
    /// minimum is dropped rather than emitted as a sliver.
    pub fn chunk(&self, document_id: Uuid, filename: &str, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut chunk_index = 0u32;

        for sentence in text.split_sentence_bounds() {
            if !current.is_empty() && current.len() + sentence.len() > self.chunk_size {
                if current.trim().len() >= self.min_size {
                    chunks.push(Chunk::new(
                        document_id,
                        filename,
                        chunk_index,
                        current.trim().to_string(),
                    ));
                    chunk_index += 1;
                }
                current = self.overlap_tail(&current);
            }
            current.push_str(sentence);
        }

        if current.trim().len() >= self.min_size {
            chunks.push(Chunk::new(
                document_id,
                filename,
                chunk_index,
                current.trim().to_string(),
            ));
        }

        chunks
    }

    /// Overlap text carried from the end of the previous chunk
    fn overlap_tail(&self, text: &str) -> String {
        if text.len() <= self.overlap {
            return text.to_string();
        }

        let mut start = text.len().saturating_sub(self.overlap);
        while start > 0 && !text.is_char_boundary(start) {
            start -= 1;
        }
        let tail = &text[start..];

        // Prefer a sentence boundary inside the overlap window
        if let Some(pos) = tail.find(". ") {
            return tail[pos + 2..].to_string();
        }
        if let Some(pos) = tail.find(' ') {
            return tail[pos + 1..].to_string();
        }
        tail.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(chunk_size: usize, overlap: usize, min_size: usize) -> TextChunker {
        TextChunker::new(&ChunkingConfig {
            chunk_size,
            chunk_overlap: overlap,
            min_chunk_size: min_size,
            ..ChunkingConfig::default()
        })
    }

    #[test]
    fn short_text_produces_one_chunk() {
        let c = chunker(1024, 200, 10);
        let chunks = c.chunk(Uuid::new_v4(), "a.txt", "A single short sentence.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].content, "A single short sentence.");
    }

    #[test]
    fn long_text_splits_on_sentence_boundaries() {
        let c = chunker(80, 20, 10);
        let text = "The first sentence is here. The second sentence follows it. \
                    The third one keeps going. The fourth wraps things up nicely.";
        let chunks = c.chunk(Uuid::new_v4(), "a.txt", text);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert!(!chunk.content.trim().is_empty());
        }
    }

    #[test]
    fn consecutive_chunks_share_overlap() {
        let c = chunker(60, 30, 5);
        let text = "Alpha beta gamma delta epsilon. Zeta eta theta iota kappa. \
                    Lambda mu nu xi omicron pi.";
        let chunks = c.chunk(Uuid::new_v4(), "a.txt", text);

        assert!(chunks.len() >= 2);
        // Some suffix of chunk 0 reappears at the start of chunk 1
        let tail_word = chunks[0].content.split_whitespace().last();
        assert!(tail_word.is_some_and(|w| chunks[1].content.contains(w.trim_end_matches('.'))));
    }

    #[test]
    fn trailing_sliver_below_minimum_is_dropped() {
        let c = chunker(50, 0, 40);
        let text = "This opening sentence is long enough to stand alone. Tiny tail.";
        let chunks = c.chunk(Uuid::new_v4(), "a.txt", text);

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.starts_with("This opening"));
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        let c = chunker(1024, 200, 50);
        assert!(c.chunk(Uuid::new_v4(), "a.txt", "").is_empty());
        assert!(c.chunk(Uuid::new_v4(), "a.txt", "   \n  ").is_empty());
    }

    #[test]
    fn chunks_carry_document_id_and_filename() {
        let doc = Uuid::new_v4();
        let c = chunker(1024, 200, 5);
        let chunks = c.chunk(doc, "notes.txt", "One sufficient sentence here.");
        assert_eq!(chunks[0].document_id, doc);
        assert_eq!(chunks[0].filename, "notes.txt");
    }
}
