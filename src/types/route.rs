//! Query route types

use serde::{Deserialize, Serialize};

/// Classified intent of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// Structure/summary questions ("what does this document cover?")
    Meta,
    /// Fact/definition questions ("what is gravity?")
    Detail,
    /// Ambiguous, or needing both channels
    Hybrid,
}

impl std::fmt::Display for RouteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteKind::Meta => write!(f, "meta"),
            RouteKind::Detail => write!(f, "detail"),
            RouteKind::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Routing decision for one query
///
/// Produced by the router, consumed immediately by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    /// Classified query kind
    pub kind: RouteKind,
    /// Optional retrieval-friendly rewrite of the query
    pub rewritten_query: Option<String>,
    /// Why the router chose this classification
    pub reasoning: String,
}

impl Route {
    /// Fallback route used whenever classification fails: HYBRID with the
    /// original query, so the pipeline is never blocked by the router.
    pub fn fallback(query: &str, reason: impl Into<String>) -> Self {
        Self {
            kind: RouteKind::Hybrid,
            rewritten_query: Some(query.to_string()),
            reasoning: reason.into(),
        }
    }

    /// The query the retriever should run: the rewrite when present,
    /// otherwise the original.
    pub fn retrieval_query<'a>(&'a self, original: &'a str) -> &'a str {
        self.rewritten_query.as_deref().unwrap_or(original)
    }
}
