//! Document ingestion: chunking, validation, and indexing

pub mod chunker;
pub mod pipeline;

pub use chunker::TextChunker;
pub use pipeline::{ChunkRejection, IngestReport, IngestionPipeline};
