//! Query orchestrator: route, retrieve, grade, generate, validate
//!
//! Corrective retrieval is bounded: an insufficient grade triggers a
//! rewritten retrieval pass at most `max_retries` times, after which the
//! pipeline generates from the best context it has. Every completed step
//! writes a checkpoint, so a run can be resumed from its last committed
//! state.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{FusionWeights, RagConfig};
use crate::error::{Error, Result};
use crate::generation::{extract_and_link_citations, PromptBuilder, GENERATION_SYSTEM_PROMPT};
use crate::providers::{CheckpointStore, ContentSafety, TextGenerator, VectorSearcher};
use crate::retrieval::{fuse, QueryRouter, RelevanceGrader, SharedIndex, VerdictCache};
use crate::types::{
    Checkpoint, Citation, PipelineState, QueryAnswer, RetrievalSource, RetrievedChunk, Route,
    RouteKind, RunStatus, Step,
};

use super::state::{apply, Event};

/// Orchestrates one query through the full pipeline
pub struct QueryPipeline {
    llm: Arc<dyn TextGenerator>,
    vector_store: Arc<dyn VectorSearcher>,
    safety: Arc<dyn ContentSafety>,
    checkpoints: Arc<dyn CheckpointStore>,
    index: SharedIndex,
    router: QueryRouter,
    grader: RelevanceGrader,
    config: RagConfig,
}

impl QueryPipeline {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        vector_store: Arc<dyn VectorSearcher>,
        safety: Arc<dyn ContentSafety>,
        checkpoints: Arc<dyn CheckpointStore>,
        index: SharedIndex,
        config: RagConfig,
    ) -> Self {
        let router = QueryRouter::new(llm.clone(), config.orchestrator.routing_timeout_secs);
        let grader = RelevanceGrader::new(llm.clone(), config.grading.clone());
        Self {
            llm,
            vector_store,
            safety,
            checkpoints,
            index,
            router,
            grader,
            config,
        }
    }

    /// Answer a question against the ingested corpus
    pub async fn query(&self, question: &str) -> Result<QueryAnswer> {
        let state = PipelineState::new(question);
        info!("[{}] Query run started", state.run_id);
        self.run(state).await
    }

    /// Resume a run from its latest checkpoint
    ///
    /// Terminal checkpoints yield the recorded result without
    /// re-execution. A run interrupted mid-flight re-enters after its
    /// last committed step: a committed route is reused rather than
    /// re-derived, the spent retry budget stays spent, and only the
    /// steps whose outputs are ephemeral (retrieval context onward)
    /// re-execute.
    pub async fn resume(&self, run_id: &Uuid) -> Result<QueryAnswer> {
        let checkpoint = self
            .checkpoints
            .latest(run_id)
            .await?
            .ok_or_else(|| Error::internal(format!("no checkpoints for run {}", run_id)))?;

        match checkpoint.state.status {
            RunStatus::Completed => {
                let answer = checkpoint
                    .state
                    .output_text
                    .clone()
                    .ok_or_else(|| Error::internal("completed run has no output"))?;
                let citations = checkpoint
                    .state
                    .metadata
                    .get("citations")
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default();
                Ok(QueryAnswer {
                    run_id: *run_id,
                    answer,
                    citations,
                    retries_used: checkpoint.state.retry_count,
                })
            }
            RunStatus::Failed => Err(Error::generation(
                checkpoint
                    .state
                    .error
                    .unwrap_or_else(|| "run failed without a recorded reason".to_string()),
            )),
            _ => {
                info!(
                    "[{}] Resuming from step {:?}",
                    run_id,
                    checkpoint.step.map(|s| s.to_string())
                );
                self.run(checkpoint.state).await
            }
        }
    }

    async fn run(&self, mut state: PipelineState) -> Result<QueryAnswer> {
        let question = state.input_text.clone();
        let run_id = state.run_id;

        // A resumed run re-enters after its last committed step: a route
        // that already survived a checkpoint is reused, not re-derived.
        let route = if state.steps_completed.contains(&Step::Routing) {
            let route = state
                .metadata
                .get("route")
                .and_then(|v| serde_json::from_value::<Route>(v.clone()).ok())
                .unwrap_or_else(|| {
                    Route::fallback(&question, "resumed run has no recorded route")
                });
            info!("[{}] Reusing committed {} route", run_id, route.kind);
            route
        } else {
            // Routing never fails the run
            state = apply(state, Event::StepStarted(Step::Routing));
            let route = self.router.route(&question).await;
            info!("[{}] Routed as {}", run_id, route.kind);
            state
                .metadata
                .insert("route".to_string(), serde_json::to_value(&route)?);
            state = self.commit(state, Step::Routing).await?;
            route
        };

        // Corrective retrieval loop, bounded by max_retries
        let mut retrieval_query = route.retrieval_query(&question).to_string();
        let mut verdicts = VerdictCache::new();
        let context = loop {
            state = apply(state, Event::StepStarted(Step::Retrieving));
            let context = self.retrieve(&retrieval_query, route.kind).await;
            state = self.commit(state, Step::Retrieving).await?;

            state = apply(state, Event::StepStarted(Step::Grading));
            let grade = self.grader.grade(&mut verdicts, &question, &context).await;
            state = self.commit(state, Step::Grading).await?;

            if grade.sufficient {
                break context;
            }
            if state.retry_count >= self.config.orchestrator.max_retries {
                warn!(
                    "[{}] Retry budget exhausted, generating from best-effort context",
                    run_id
                );
                break context;
            }

            info!("[{}] Context insufficient, retrying: {}", run_id, grade.reason);
            state = apply(
                state,
                Event::RetryScheduled {
                    reason: grade.reason.clone(),
                },
            );
            self.checkpoints.append(Checkpoint::of(&state)).await?;
            // Feed the grader's gap back into the next retrieval pass
            if !grade.reason.trim().is_empty() {
                retrieval_query = format!("{} {}", retrieval_query, grade.reason);
            }
        };

        // Generation failures are fatal
        state = apply(state, Event::StepStarted(Step::Generating));
        let mut citations: Vec<Citation> = context
            .iter()
            .map(|r| Citation::from_retrieved(r, 200))
            .collect();
        let prompt = PromptBuilder::build_rag_prompt(
            &question,
            &PromptBuilder::build_context(&context),
            &citations,
        );
        let generated = timeout(
            Duration::from_secs(self.config.orchestrator.generation_timeout_secs),
            self.llm.generate_text(&prompt, GENERATION_SYSTEM_PROMPT),
        )
        .await;
        let raw_answer = match generated {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                return self
                    .fail(state, Error::generation(format!("generation failed: {}", e)))
                    .await;
            }
            Err(_) => {
                return self
                    .fail(
                        state,
                        Error::Timeout(
                            self.config.orchestrator.generation_timeout_secs,
                            "generation",
                        ),
                    )
                    .await;
            }
        };
        state = self.commit(state, Step::Generating).await?;

        // Validation: an unsafe answer is never surfaced
        state = apply(state, Event::StepStarted(Step::Validating));
        let moderation = timeout(
            Duration::from_secs(self.config.orchestrator.safety_timeout_secs),
            self.safety.moderate(&raw_answer),
        )
        .await;
        match moderation {
            Ok(Ok(m)) if m.allowed => {}
            Ok(Ok(_)) => {
                return self
                    .fail(
                        state,
                        Error::SafetyViolation("answer failed content validation".to_string()),
                    )
                    .await;
            }
            Ok(Err(e)) => {
                return self
                    .fail(
                        state,
                        Error::SafetyViolation(format!("content validation unavailable: {}", e)),
                    )
                    .await;
            }
            Err(_) => {
                return self
                    .fail(
                        state,
                        Error::Timeout(self.config.orchestrator.safety_timeout_secs, "validation"),
                    )
                    .await;
            }
        }
        state = self.commit(state, Step::Validating).await?;

        let (answer, linked) = extract_and_link_citations(&raw_answer, &mut citations);
        state
            .metadata
            .insert("citations".to_string(), serde_json::to_value(&linked)?);
        let retries_used = state.retry_count;
        let state = apply(
            state,
            Event::Finished {
                output: answer.clone(),
            },
        );
        self.checkpoints.append(Checkpoint::of(&state)).await?;
        info!(
            "[{}] Query run completed with {} citation(s), {} retr(ies) used",
            run_id,
            linked.len(),
            retries_used
        );

        Ok(QueryAnswer {
            run_id,
            answer,
            citations: linked,
            retries_used,
        })
    }

    /// One retrieval pass: both channels, then fusion, then truncation
    ///
    /// A failed or timed-out vector search degrades the pass to
    /// keyword-only rather than failing the run.
    async fn retrieve(&self, query: &str, kind: RouteKind) -> Vec<RetrievedChunk> {
        let snapshot = self.index.snapshot();
        let keyword = snapshot.search(query, self.config.retrieval.channel_top_k);

        let vector = match timeout(
            Duration::from_secs(self.config.orchestrator.retrieval_timeout_secs),
            self.vector_store
                .search(query, self.config.retrieval.channel_top_k),
        )
        .await
        {
            Ok(Ok(hits)) => hits
                .into_iter()
                .filter_map(|(id, score)| {
                    snapshot.get(&id).map(|chunk| RetrievedChunk {
                        chunk: chunk.clone(),
                        score,
                        source: RetrievalSource::Vector,
                    })
                })
                .collect(),
            Ok(Err(e)) => {
                warn!("Vector search failed, degrading to keyword-only: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!("Vector search timed out, degrading to keyword-only");
                Vec::new()
            }
        };

        let mut fused = fuse(keyword, vector, &self.weights_for(kind));
        fused.truncate(self.config.retrieval.context_top_k);
        fused
    }

    fn weights_for(&self, kind: RouteKind) -> FusionWeights {
        match kind {
            RouteKind::Detail => self.config.fusion.detail,
            RouteKind::Meta => self.config.fusion.meta,
            RouteKind::Hybrid => self.config.fusion.hybrid,
        }
    }

    async fn commit(&self, state: PipelineState, step: Step) -> Result<PipelineState> {
        let state = apply(state, Event::StepCompleted(step));
        self.checkpoints.append(Checkpoint::of(&state)).await?;
        Ok(state)
    }

    async fn fail(&self, state: PipelineState, error: Error) -> Result<QueryAnswer> {
        warn!("[{}] Query run failed: {}", state.run_id, error);
        let state = apply(
            state,
            Event::Failed {
                reason: error.to_string(),
            },
        );
        self.checkpoints.append(Checkpoint::of(&state)).await?;
        Err(error)
    }
}
