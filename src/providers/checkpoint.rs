//! Checkpoint persistence trait and in-memory implementation

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::types::Checkpoint;

/// Trait for the external checkpoint/persistence collaborator
///
/// Checkpoints are append-only per `run_id`; the latest entry is the resume
/// point for an interrupted run. Implementations report storage failures as
/// `Error::Checkpoint`; the in-memory store below cannot fail.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Append a checkpoint to a run's history
    async fn append(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Latest checkpoint for a run, if any
    async fn latest(&self, run_id: &Uuid) -> Result<Option<Checkpoint>>;

    /// Full checkpoint history for a run, oldest first
    async fn history(&self, run_id: &Uuid) -> Result<Vec<Checkpoint>>;
}

/// In-memory checkpoint store
///
/// The production deployment points this trait at its own persistence; tests
/// and single-process embedding use this map.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    runs: DashMap<Uuid, Vec<Checkpoint>>,
}

impl MemoryCheckpointStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn append(&self, checkpoint: Checkpoint) -> Result<()> {
        self.runs
            .entry(checkpoint.run_id)
            .or_default()
            .push(checkpoint);
        Ok(())
    }

    async fn latest(&self, run_id: &Uuid) -> Result<Option<Checkpoint>> {
        Ok(self
            .runs
            .get(run_id)
            .and_then(|history| history.last().cloned()))
    }

    async fn history(&self, run_id: &Uuid) -> Result<Vec<Checkpoint>> {
        Ok(self
            .runs
            .get(run_id)
            .map(|history| history.clone())
            .unwrap_or_default())
    }
}
