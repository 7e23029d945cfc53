//! External provider traits and built-in implementations
//!
//! Every external collaborator the pipeline touches is behind a trait:
//! text generation, vector similarity search, content moderation, and
//! checkpoint persistence. Production code wires Ollama and a real
//! vector store; tests substitute in-memory fakes.

pub mod checkpoint;
pub mod llm;
pub mod ollama;
pub mod safety;
pub mod vector_store;

pub use checkpoint::{CheckpointStore, MemoryCheckpointStore};
pub use llm::TextGenerator;
pub use ollama::OllamaClient;
pub use safety::{ContentSafety, Moderation};
pub use vector_store::{VectorHit, VectorSearcher};
