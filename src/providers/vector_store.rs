//! Vector search provider trait

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::Chunk;

/// A raw hit from the vector collaborator: chunk id plus similarity score
pub type VectorHit = (Uuid, f32);

/// Trait for the external vector-similarity store
///
/// The store owns embedding generation internally; this crate only passes
/// query text and chunk content through. `search` may legitimately return an
/// empty list.
#[async_trait]
pub trait VectorSearcher: Send + Sync {
    /// Search for chunks similar to the query text
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<VectorHit>>;

    /// Insert or update chunks in the store
    async fn upsert(&self, chunks: &[Chunk]) -> Result<()>;

    /// Delete all vectors for a document
    async fn delete_by_document(&self, document_id: &Uuid) -> Result<usize>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
