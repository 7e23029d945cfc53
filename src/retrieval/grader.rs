//! LLM relevance grader with per-run cached verdicts

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::GradingConfig;
use crate::error::Error;
use crate::providers::TextGenerator;
use crate::types::RetrievedChunk;

const GRADER_SYSTEM_PROMPT: &str = "You judge whether retrieved passages can answer a question. \
Respond with JSON only.";

/// Sufficiency verdict over a retrieved context
#[derive(Debug, Clone, Deserialize)]
pub struct Grade {
    /// Whether the context can answer the query
    pub sufficient: bool,
    /// Grader's explanation, fed back into retry rewrites
    #[serde(default)]
    pub reason: String,
}

/// Verdicts already issued during one run, keyed by context hash
///
/// Owned by the run, not the grader, so the cache lives exactly as long
/// as the retry loop that needs its stability and is dropped with it.
pub type VerdictCache = HashMap<String, Grade>;

/// Judges retrieved context against the query
///
/// Verdicts are cached per run by a hash of the query and the chunk-id
/// set, so grading the same context twice (as corrective retries can)
/// returns the same answer instead of a fresh model roll.
pub struct RelevanceGrader {
    llm: Arc<dyn TextGenerator>,
    config: GradingConfig,
}

impl RelevanceGrader {
    pub fn new(llm: Arc<dyn TextGenerator>, config: GradingConfig) -> Self {
        Self { llm, config }
    }

    /// Grade the context. Any model, parse, or timeout failure is treated
    /// as insufficient with the error named in the reason.
    pub async fn grade(
        &self,
        cache: &mut VerdictCache,
        query: &str,
        results: &[RetrievedChunk],
    ) -> Grade {
        if results.is_empty() {
            return Grade {
                sufficient: false,
                reason: "no chunks retrieved".to_string(),
            };
        }

        let key = Self::cache_key(query, results);
        if let Some(cached) = cache.get(&key) {
            debug!("Grading verdict cache hit");
            return cached.clone();
        }

        let grade = self.grade_uncached(query, results).await;
        cache.insert(key, grade.clone());
        grade
    }

    async fn grade_uncached(&self, query: &str, results: &[RetrievedChunk]) -> Grade {
        let prompt = self.build_prompt(query, results);

        let verdict = timeout(
            Duration::from_secs(self.config.timeout_secs),
            self.llm.generate_json(&prompt, GRADER_SYSTEM_PROMPT),
        )
        .await;

        let value = match verdict {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                let error = Error::Grading(e.to_string());
                warn!("{}, treating context as insufficient", error);
                return Grade {
                    sufficient: false,
                    reason: error.to_string(),
                };
            }
            Err(_) => {
                let error = Error::Timeout(self.config.timeout_secs, "grading");
                warn!("{}, treating context as insufficient", error);
                return Grade {
                    sufficient: false,
                    reason: error.to_string(),
                };
            }
        };

        match serde_json::from_value::<Grade>(value) {
            Ok(grade) => grade,
            Err(e) => {
                let error = Error::Grading(format!("unparseable grading verdict: {}", e));
                warn!("{}", error);
                Grade {
                    sufficient: false,
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Hash of the query plus the sorted chunk-id set
    fn cache_key(query: &str, results: &[RetrievedChunk]) -> String {
        let mut ids: Vec<String> = results.iter().map(|r| r.chunk.id.to_string()).collect();
        ids.sort();

        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        for id in &ids {
            hasher.update(b"\n");
            hasher.update(id.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    fn build_prompt(&self, query: &str, results: &[RetrievedChunk]) -> String {
        let mut previews = String::new();
        for (i, r) in results.iter().take(self.config.top_n).enumerate() {
            let preview: String = r.chunk.content.chars().take(self.config.preview_chars).collect();
            previews.push_str(&format!(
                "[{}] ({}, chunk {}): {}\n\n",
                i + 1,
                r.chunk.filename,
                r.chunk.chunk_index,
                preview
            ));
        }

        format!(
            "Question: {}\n\n\
             Retrieved passages:\n{}\
             Can these passages answer the question? Respond with JSON: \
             {{\"sufficient\": true|false, \"reason\": \"one sentence, and if \
             insufficient say what is missing\"}}",
            query, previews
        )
    }
}
