//! Pure state transitions for pipeline runs
//!
//! Orchestrators never mutate `PipelineState` directly. They build an
//! `Event` and apply it here, which keeps every state change auditable
//! and makes the machines trivially testable without providers.

use crate::types::{PipelineState, RunStatus, Step};

/// One observed fact about a run
#[derive(Debug, Clone)]
pub enum Event {
    /// A step has begun executing
    StepStarted(Step),
    /// The current step finished successfully
    StepCompleted(Step),
    /// The grader rejected the context; another retrieval pass is scheduled
    RetryScheduled { reason: String },
    /// The run produced its final output
    Finished { output: String },
    /// The run failed terminally
    Failed { reason: String },
}

/// Apply an event to a state, producing the successor state
///
/// Terminal states absorb all events unchanged.
pub fn apply(mut state: PipelineState, event: Event) -> PipelineState {
    if state.status.is_terminal() {
        return state;
    }

    match event {
        Event::StepStarted(step) => {
            state.status = RunStatus::Running;
            state.current_step = Some(step);
        }
        Event::StepCompleted(step) => {
            state.steps_completed.push(step);
            state.current_step = None;
        }
        Event::RetryScheduled { reason } => {
            state.retry_count += 1;
            state.metadata.insert(
                format!("retry_{}_reason", state.retry_count),
                serde_json::Value::String(reason),
            );
        }
        Event::Finished { output } => {
            state.status = RunStatus::Completed;
            state.current_step = None;
            state.output_text = Some(output);
        }
        Event::Failed { reason } => {
            state.status = RunStatus::Failed;
            state.current_step = None;
            state.error = Some(reason);
        }
    }

    state
}
