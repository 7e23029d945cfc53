//! Pipeline run state and checkpoint types
//!
//! Each run owns exactly one `PipelineState`, advanced only through the pure
//! transition function in `pipeline::state`. A `Checkpoint` is written after
//! every completed transition, making runs resumable from the last committed
//! step.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, no step executed yet
    Pending,
    /// A step is in flight
    Running,
    /// Terminal: answer produced (or document indexed)
    Completed,
    /// Terminal: run failed with a reason
    Failed,
}

impl RunStatus {
    /// True for `Completed` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// A step in either state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    // Query machine
    Routing,
    Retrieving,
    Grading,
    Generating,
    Validating,
    // Ingestion machine
    Parsing,
    Chunking,
    ValidatingChunks,
    Indexing,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Routing => "routing",
            Step::Retrieving => "retrieving",
            Step::Grading => "grading",
            Step::Generating => "generating",
            Step::Validating => "validating",
            Step::Parsing => "parsing",
            Step::Chunking => "chunking",
            Step::ValidatingChunks => "validating_chunks",
            Step::Indexing => "indexing",
        };
        write!(f, "{}", name)
    }
}

/// State of one pipeline run
///
/// Owned by the orchestrator for the lifetime of the run; every field change
/// goes through a transition, never ad-hoc mutation. The `metadata` map holds
/// per-step outputs (route, grade verdicts, rejected chunk ids) keyed by
/// documented names; writes overwrite, `steps_completed` only appends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique run ID
    pub run_id: Uuid,
    /// Overall status
    pub status: RunStatus,
    /// Step currently in flight (None before start and after a terminal state)
    pub current_step: Option<Step>,
    /// Steps completed so far, in execution order (retried steps repeat)
    pub steps_completed: Vec<Step>,
    /// Corrective retrieval retries used
    pub retry_count: u32,
    /// Failure reason when status is Failed
    pub error: Option<String>,
    /// The input: query text or document text
    pub input_text: String,
    /// The output: generated answer, set when status is Completed
    pub output_text: Option<String>,
    /// Per-step outputs, keyed by step name
    pub metadata: HashMap<String, serde_json::Value>,
}

impl PipelineState {
    /// Create a pending run state
    pub fn new(input_text: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Pending,
            current_step: None,
            steps_completed: Vec::new(),
            retry_count: 0,
            error: None,
            input_text: input_text.into(),
            output_text: None,
            metadata: HashMap::new(),
        }
    }
}

/// Durable snapshot of a run at one completed step
///
/// Append-only, keyed by `run_id`; the latest checkpoint is the resume point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The run this snapshot belongs to
    pub run_id: Uuid,
    /// The step that had just completed (None for the initial pending snapshot)
    pub step: Option<Step>,
    /// Full state after the transition
    pub state: PipelineState,
    /// When the snapshot was written
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Checkpoint {
    /// Snapshot the given state
    pub fn of(state: &PipelineState) -> Self {
        Self {
            run_id: state.run_id,
            step: state.steps_completed.last().copied(),
            state: state.clone(),
            created_at: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_pending() {
        let state = PipelineState::new("what is gravity?");
        assert_eq!(state.status, RunStatus::Pending);
        assert!(state.current_step.is_none());
        assert!(state.steps_completed.is_empty());
        assert_eq!(state.retry_count, 0);
    }

    #[test]
    fn terminal_statuses() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }

    #[test]
    fn checkpoint_records_last_completed_step() {
        let mut state = PipelineState::new("q");
        assert!(Checkpoint::of(&state).step.is_none());

        state.steps_completed.push(Step::Routing);
        state.steps_completed.push(Step::Retrieving);
        let cp = Checkpoint::of(&state);
        assert_eq!(cp.step, Some(Step::Retrieving));
        assert_eq!(cp.run_id, state.run_id);
    }
}
