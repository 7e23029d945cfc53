//! LLM query router: classify intent and rewrite for retrieval

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::Error;
use crate::providers::TextGenerator;
use crate::types::{Route, RouteKind};

const ROUTER_SYSTEM_PROMPT: &str = "You are a query router for a document retrieval system. \
Classify the user's question and respond with JSON only.";

fn default_reasoning() -> String {
    "no reasoning provided".to_string()
}

/// Raw serde shape for the model's routing verdict
#[derive(Deserialize)]
struct RouteVerdict {
    route: String,
    #[serde(default)]
    rewritten_query: Option<String>,
    #[serde(default = "default_reasoning")]
    reasoning: String,
}

/// Classifies queries into retrieval strategies via the LLM
///
/// Routing never fails: any model, parse, or timeout error degrades to
/// a `Hybrid` route over the original query.
pub struct QueryRouter {
    llm: Arc<dyn TextGenerator>,
    timeout_secs: u64,
}

impl QueryRouter {
    pub fn new(llm: Arc<dyn TextGenerator>, timeout_secs: u64) -> Self {
        Self { llm, timeout_secs }
    }

    /// Route a query, falling back to `Hybrid` on any failure
    pub async fn route(&self, query: &str) -> Route {
        let prompt = Self::build_prompt(query);

        let verdict = timeout(
            Duration::from_secs(self.timeout_secs),
            self.llm.generate_json(&prompt, ROUTER_SYSTEM_PROMPT),
        )
        .await;

        let value = match verdict {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                let error = Error::Routing(e.to_string());
                warn!("{}, falling back to hybrid", error);
                return Route::fallback(query, error.to_string());
            }
            Err(_) => {
                let error = Error::Timeout(self.timeout_secs, "routing");
                warn!("{}, falling back to hybrid", error);
                return Route::fallback(query, error.to_string());
            }
        };

        match serde_json::from_value::<RouteVerdict>(value) {
            Ok(verdict) => {
                let Some(kind) = Self::parse_kind(&verdict.route) else {
                    let error =
                        Error::Routing(format!("unknown route kind '{}'", verdict.route));
                    warn!("{}, falling back to hybrid", error);
                    return Route::fallback(query, error.to_string());
                };
                debug!("Routed query as {} ({})", kind, verdict.reasoning);
                Route {
                    kind,
                    rewritten_query: verdict
                        .rewritten_query
                        .filter(|q| !q.trim().is_empty()),
                    reasoning: verdict.reasoning,
                }
            }
            Err(e) => {
                let error = Error::Routing(format!("unparseable routing verdict: {}", e));
                warn!("{}, falling back to hybrid", error);
                Route::fallback(query, error.to_string())
            }
        }
    }

    fn parse_kind(raw: &str) -> Option<RouteKind> {
        match raw.trim().to_uppercase().as_str() {
            "META" => Some(RouteKind::Meta),
            "DETAIL" => Some(RouteKind::Detail),
            "HYBRID" => Some(RouteKind::Hybrid),
            _ => None,
        }
    }

    fn build_prompt(query: &str) -> String {
        format!(
            "Classify this question for document retrieval.\n\n\
             Routes:\n\
             - META: about the documents themselves (what files exist, summaries, topics covered)\n\
             - DETAIL: about specific facts or passages inside the documents\n\
             - HYBRID: needs both, or the intent is unclear\n\n\
             Question: {}\n\n\
             Respond with JSON: {{\"route\": \"META|DETAIL|HYBRID\", \
             \"rewritten_query\": \"a version rephrased for keyword search, or null\", \
             \"reasoning\": \"one sentence\"}}",
            query
        )
    }
}
