//! Retrieval: keyword index, channel fusion, routing, and grading

pub mod bm25;
pub mod fusion;
pub mod grader;
pub mod router;

pub use bm25::{tokenize, Bm25Index, Bm25Params, SharedIndex};
pub use fusion::fuse;
pub use grader::{Grade, RelevanceGrader, VerdictCache};
pub use router::QueryRouter;
