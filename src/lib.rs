//! tutor-rag: hybrid retrieval with corrective generation
//!
//! A RAG pipeline over a local document corpus: queries are routed by an
//! LLM, retrieved through fused keyword (BM25) and vector channels, graded
//! for sufficiency with bounded corrective retries, then answered with
//! grounded, citation-linked generation. Ingestion and querying are both
//! checkpointed state machines, resumable from their last committed step.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use ingestion::{IngestReport, IngestionPipeline};
pub use pipeline::QueryPipeline;
pub use types::{
    chunk::{Chunk, Document, RetrievedChunk},
    response::{Citation, QueryAnswer},
    route::{Route, RouteKind},
};
