//! Core data types

pub mod chunk;
pub mod pipeline;
pub mod response;
pub mod route;

pub use chunk::{Chunk, Document, RetrievalSource, RetrievedChunk};
pub use pipeline::{Checkpoint, PipelineState, RunStatus, Step};
pub use response::{Citation, QueryAnswer};
pub use route::{Route, RouteKind};
