//! Document ingestion state machine
//!
//! Parsing -> Chunking -> ValidatingChunks -> Indexing, with a checkpoint
//! after every completed step. Individual bad chunks are dropped and
//! recorded; only a document with zero surviving chunks fails the run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ChunkingConfig, OrchestratorConfig, RetrievalConfig};
use crate::error::{Error, Result};
use crate::providers::{CheckpointStore, ContentSafety, VectorSearcher};
use crate::retrieval::{Bm25Index, Bm25Params, SharedIndex};
use crate::types::{Checkpoint, Chunk, Document, PipelineState, RunStatus, Step};

use crate::pipeline::state::{apply, Event};

use super::chunker::TextChunker;

/// A chunk dropped during validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRejection {
    /// Index of the rejected chunk within its document
    pub chunk_index: u32,
    /// Why it was dropped
    pub reason: String,
}

/// Outcome of one ingestion run
#[derive(Debug)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// The document record, present when ingestion completed
    pub document: Option<Document>,
    /// Chunks that survived validation and were indexed
    pub chunks_indexed: u32,
    /// Chunks dropped during validation
    pub rejections: Vec<ChunkRejection>,
    /// Failure reason when status is Failed
    pub error: Option<String>,
}

/// The ingested corpus: document records plus every indexed chunk
#[derive(Default)]
struct Corpus {
    documents: Vec<Document>,
    chunks: Vec<Chunk>,
    hashes: HashSet<String>,
}

/// Ingests documents into the keyword index and the vector store
pub struct IngestionPipeline {
    corpus: RwLock<Corpus>,
    index: SharedIndex,
    vector_store: Arc<dyn VectorSearcher>,
    safety: Arc<dyn ContentSafety>,
    checkpoints: Arc<dyn CheckpointStore>,
    chunker: TextChunker,
    chunking: ChunkingConfig,
    safety_timeout_secs: u64,
    indexing_timeout_secs: u64,
    bm25_params: Bm25Params,
}

impl IngestionPipeline {
    pub fn new(
        index: SharedIndex,
        vector_store: Arc<dyn VectorSearcher>,
        safety: Arc<dyn ContentSafety>,
        checkpoints: Arc<dyn CheckpointStore>,
        chunking: ChunkingConfig,
        retrieval: &RetrievalConfig,
        orchestrator: &OrchestratorConfig,
    ) -> Self {
        Self {
            corpus: RwLock::new(Corpus::default()),
            index,
            vector_store,
            safety,
            checkpoints,
            chunker: TextChunker::new(&chunking),
            chunking,
            safety_timeout_secs: orchestrator.safety_timeout_secs,
            indexing_timeout_secs: orchestrator.indexing_timeout_secs,
            bm25_params: Bm25Params::from(retrieval),
        }
    }

    /// Handle to the index this pipeline maintains
    pub fn index(&self) -> SharedIndex {
        self.index.clone()
    }

    /// Documents ingested so far
    pub fn documents(&self) -> Vec<Document> {
        self.corpus.read().documents.clone()
    }

    /// Ingest one document
    ///
    /// Returns a report for both completed and failed runs; `Err` is
    /// reserved for checkpoint-store failures.
    pub async fn ingest(&self, filename: &str, text: &str) -> Result<IngestReport> {
        let mut state = PipelineState::new(text);
        state
            .metadata
            .insert("filename".to_string(), serde_json::Value::String(filename.to_string()));
        let run_id = state.run_id;
        info!("[{}] Ingesting '{}'", run_id, filename);

        // Parsing
        state = self.begin(state, Step::Parsing);
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return self
                .fail(
                    state,
                    Error::EmptyIngest("document is empty after normalization".to_string()),
                )
                .await;
        }
        let content_hash = hex::encode(Sha256::digest(normalized.as_bytes()));
        if self.corpus.read().hashes.contains(&content_hash) {
            return self
                .fail(
                    state,
                    Error::Index(format!(
                        "duplicate document: content hash {} already ingested",
                        content_hash
                    )),
                )
                .await;
        }
        let mut document = Document::new(filename, content_hash.clone());
        state = self.complete(state, Step::Parsing).await?;

        // Chunking
        state = self.begin(state, Step::Chunking);
        let chunks = self.chunker.chunk(document.id, filename, &normalized);
        if chunks.is_empty() {
            return self
                .fail(
                    state,
                    Error::EmptyIngest("document produced no chunks".to_string()),
                )
                .await;
        }
        state = self.complete(state, Step::Chunking).await?;

        // Chunk validation
        state = self.begin(state, Step::ValidatingChunks);
        let (survivors, rejections) = self.validate_chunks(chunks).await;
        if !rejections.is_empty() {
            warn!(
                "[{}] Dropped {} invalid chunk(s) from '{}'",
                run_id,
                rejections.len(),
                filename
            );
            state.metadata.insert(
                "rejected_chunks".to_string(),
                serde_json::to_value(&rejections)?,
            );
        }
        if survivors.is_empty() {
            return self
                .fail(
                    state,
                    Error::EmptyIngest(format!(
                        "all {} chunks failed validation",
                        rejections.len()
                    )),
                )
                .await;
        }
        state = self.complete(state, Step::ValidatingChunks).await?;

        // Indexing: vector store first, so a failed upsert leaves the
        // corpus and keyword index untouched.
        state = self.begin(state, Step::Indexing);
        let upsert = timeout(
            Duration::from_secs(self.indexing_timeout_secs),
            self.vector_store.upsert(&survivors),
        )
        .await;
        match upsert {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return self
                    .fail(
                        state,
                        Error::vector_search(format!("upsert failed: {}", e)),
                    )
                    .await;
            }
            Err(_) => {
                return self
                    .fail(state, Error::Timeout(self.indexing_timeout_secs, "indexing"))
                    .await;
            }
        }
        document.total_chunks = survivors.len() as u32;
        {
            let mut corpus = self.corpus.write();
            corpus.hashes.insert(content_hash);
            corpus.chunks.extend(survivors.iter().cloned());
            corpus.documents.push(document.clone());
            self.index
                .swap(Bm25Index::build(&corpus.chunks, self.bm25_params));
        }
        state = self.complete(state, Step::Indexing).await?;

        let state = self.finish(state, &document).await?;
        info!(
            "[{}] Ingested '{}': {} chunk(s) indexed, {} rejected",
            run_id,
            filename,
            document.total_chunks,
            rejections.len()
        );

        Ok(IngestReport {
            run_id,
            status: state.status,
            document: Some(document),
            chunks_indexed: survivors.len() as u32,
            rejections,
            error: None,
        })
    }

    /// Validate chunks, splitting survivors from rejections
    async fn validate_chunks(&self, chunks: Vec<Chunk>) -> (Vec<Chunk>, Vec<ChunkRejection>) {
        let mut survivors = Vec::with_capacity(chunks.len());
        let mut rejections = Vec::new();

        for chunk in chunks {
            match self.check_chunk(&chunk).await {
                Ok(()) => survivors.push(chunk),
                Err(Error::ChunkInvalid { chunk_index, reason }) => {
                    rejections.push(ChunkRejection { chunk_index, reason });
                }
                Err(other) => {
                    rejections.push(ChunkRejection {
                        chunk_index: chunk.chunk_index,
                        reason: other.to_string(),
                    });
                }
            }
        }

        (survivors, rejections)
    }

    /// One chunk's validation verdict
    async fn check_chunk(&self, chunk: &Chunk) -> Result<()> {
        if chunk.content.trim().is_empty() {
            return Err(Error::ChunkInvalid {
                chunk_index: chunk.chunk_index,
                reason: "empty content".to_string(),
            });
        }
        if chunk.content.len() > self.chunking.max_chunk_size {
            return Err(Error::ChunkInvalid {
                chunk_index: chunk.chunk_index,
                reason: format!(
                    "exceeds maximum chunk size ({} > {})",
                    chunk.content.len(),
                    self.chunking.max_chunk_size
                ),
            });
        }

        let verdict = timeout(
            Duration::from_secs(self.safety_timeout_secs),
            self.safety.moderate(&chunk.content),
        )
        .await;
        match verdict {
            Ok(Ok(moderation)) if moderation.allowed => Ok(()),
            Ok(Ok(moderation)) => Err(Error::ChunkInvalid {
                chunk_index: chunk.chunk_index,
                reason: moderation
                    .reason
                    .unwrap_or_else(|| "rejected by content safety".to_string()),
            }),
            Ok(Err(e)) => Err(Error::ChunkInvalid {
                chunk_index: chunk.chunk_index,
                reason: format!("content safety check failed: {}", e),
            }),
            Err(_) => Err(Error::ChunkInvalid {
                chunk_index: chunk.chunk_index,
                reason: format!(
                    "content safety check timed out after {}s",
                    self.safety_timeout_secs
                ),
            }),
        }
    }

    fn begin(&self, state: PipelineState, step: Step) -> PipelineState {
        apply(state, Event::StepStarted(step))
    }

    async fn complete(&self, state: PipelineState, step: Step) -> Result<PipelineState> {
        let state = apply(state, Event::StepCompleted(step));
        self.checkpoints.append(Checkpoint::of(&state)).await?;
        Ok(state)
    }

    async fn finish(&self, state: PipelineState, document: &Document) -> Result<PipelineState> {
        let state = apply(
            state,
            Event::Finished {
                output: format!("indexed {} chunks", document.total_chunks),
            },
        );
        self.checkpoints.append(Checkpoint::of(&state)).await?;
        Ok(state)
    }

    async fn fail(&self, state: PipelineState, error: Error) -> Result<IngestReport> {
        warn!("[{}] Ingestion failed: {}", state.run_id, error);
        let reason = error.to_string();
        let state = apply(
            state,
            Event::Failed {
                reason: reason.clone(),
            },
        );
        self.checkpoints.append(Checkpoint::of(&state)).await?;
        Ok(IngestReport {
            run_id: state.run_id,
            status: RunStatus::Failed,
            document: None,
            chunks_indexed: 0,
            rejections: state
                .metadata
                .get("rejected_chunks")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default(),
            error: Some(reason),
        })
    }
}

/// Normalize raw document text: unify line endings and trim
fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MemoryCheckpointStore, Moderation};
    use async_trait::async_trait;

    struct NullVectorStore;

    #[async_trait]
    impl VectorSearcher for NullVectorStore {
        async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<(Uuid, f32)>> {
            Ok(Vec::new())
        }
        async fn upsert(&self, _chunks: &[Chunk]) -> Result<()> {
            Ok(())
        }
        async fn delete_by_document(&self, _document_id: &Uuid) -> Result<usize> {
            Ok(0)
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
        fn name(&self) -> &str {
            "null"
        }
    }

    /// Never completes an upsert
    struct StalledVectorStore;

    #[async_trait]
    impl VectorSearcher for StalledVectorStore {
        async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<(Uuid, f32)>> {
            Ok(Vec::new())
        }
        async fn upsert(&self, _chunks: &[Chunk]) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
        async fn delete_by_document(&self, _document_id: &Uuid) -> Result<usize> {
            Ok(0)
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }
        fn name(&self) -> &str {
            "stalled"
        }
    }

    struct PermissiveSafety;

    #[async_trait]
    impl ContentSafety for PermissiveSafety {
        async fn moderate(&self, _text: &str) -> Result<Moderation> {
            Ok(Moderation::allow())
        }
        fn name(&self) -> &str {
            "permissive"
        }
    }

    /// Never returns a verdict
    struct StalledSafety;

    #[async_trait]
    impl ContentSafety for StalledSafety {
        async fn moderate(&self, _text: &str) -> Result<Moderation> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Moderation::allow())
        }
        fn name(&self) -> &str {
            "stalled"
        }
    }

    fn test_chunking() -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: 120,
            chunk_overlap: 20,
            min_chunk_size: 10,
            max_chunk_size: 8192,
        }
    }

    fn pipeline_with(
        vector_store: Arc<dyn VectorSearcher>,
        safety: Arc<dyn ContentSafety>,
        checkpoints: Arc<dyn CheckpointStore>,
        chunking: ChunkingConfig,
    ) -> IngestionPipeline {
        let retrieval = RetrievalConfig::default();
        IngestionPipeline::new(
            SharedIndex::empty(Bm25Params::from(&retrieval)),
            vector_store,
            safety,
            checkpoints,
            chunking,
            &retrieval,
            &OrchestratorConfig::default(),
        )
    }

    fn pipeline() -> IngestionPipeline {
        pipeline_with(
            Arc::new(NullVectorStore),
            Arc::new(PermissiveSafety),
            Arc::new(MemoryCheckpointStore::new()),
            test_chunking(),
        )
    }

    #[tokio::test]
    async fn ingest_indexes_document_chunks() {
        let p = pipeline();
        let report = p
            .ingest(
                "physics.txt",
                "Gravity attracts two bodies toward each other. \
                 Newton described it with an inverse square law.",
            )
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert!(report.chunks_indexed >= 1);
        assert!(report.rejections.is_empty());
        assert!(!p.index().snapshot().search("gravity", 5).is_empty());
    }

    #[tokio::test]
    async fn empty_document_fails_with_reason() {
        let p = pipeline();
        let report = p.ingest("empty.txt", "   \r\n  ").await.unwrap();

        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.error.as_deref().is_some_and(|e| e.contains("empty")));
        assert!(p.index().snapshot().is_empty());
    }

    #[tokio::test]
    async fn duplicate_content_is_rejected() {
        let p = pipeline();
        let text = "A document body long enough to survive chunk validation thresholds.";

        let first = p.ingest("a.txt", text).await.unwrap();
        assert_eq!(first.status, RunStatus::Completed);

        let second = p.ingest("b.txt", text).await.unwrap();
        assert_eq!(second.status, RunStatus::Failed);
        assert!(second.error.as_deref().is_some_and(|e| e.contains("duplicate")));
        assert_eq!(p.documents().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_safety_check_rejects_the_chunk_not_the_process() {
        let p = pipeline_with(
            Arc::new(NullVectorStore),
            Arc::new(StalledSafety),
            Arc::new(MemoryCheckpointStore::new()),
            test_chunking(),
        );

        let report = p
            .ingest("slow.txt", "A single chunk that will wait on moderation.")
            .await
            .unwrap();

        // The only chunk timed out in validation, so the run fails with
        // the rejection recorded, rather than hanging.
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.rejections.len(), 1);
        assert!(report.rejections[0].reason.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_upsert_fails_the_indexing_step() {
        let p = pipeline_with(
            Arc::new(StalledVectorStore),
            Arc::new(PermissiveSafety),
            Arc::new(MemoryCheckpointStore::new()),
            test_chunking(),
        );

        let report = p
            .ingest("slow.txt", "A chunkable body that reaches the indexing step.")
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Failed);
        assert!(report
            .error
            .as_deref()
            .is_some_and(|e| e.contains("Timeout") && e.contains("indexing")));
        assert!(p.index().snapshot().is_empty());
        assert!(p.documents().is_empty());
    }

    #[tokio::test]
    async fn checkpoints_are_written_per_step() {
        let checkpoints = Arc::new(MemoryCheckpointStore::new());
        let p = pipeline_with(
            Arc::new(NullVectorStore),
            Arc::new(PermissiveSafety),
            checkpoints.clone(),
            ChunkingConfig {
                min_chunk_size: 5,
                ..ChunkingConfig::default()
            },
        );

        let report = p
            .ingest("a.txt", "A short but chunkable document body.")
            .await
            .unwrap();
        let history = checkpoints.history(&report.run_id).await.unwrap();

        // Four step checkpoints plus the terminal one
        assert_eq!(history.len(), 5);
        let last = history.last().unwrap();
        assert_eq!(last.state.status, RunStatus::Completed);
        assert_eq!(
            last.state.steps_completed,
            vec![
                Step::Parsing,
                Step::Chunking,
                Step::ValidatingChunks,
                Step::Indexing
            ]
        );
    }

}
