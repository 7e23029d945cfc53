//! Content-safety provider trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Verdict from the content-safety collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moderation {
    /// Whether the text may be shown to the user
    pub allowed: bool,
    /// Why it was rejected, when it was
    pub reason: Option<String>,
}

impl Moderation {
    /// An allowing verdict
    pub fn allow() -> Self {
        Self { allowed: true, reason: None }
    }

    /// A rejecting verdict
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Trait for the external content-safety service
///
/// Used twice: on generated answers before they are surfaced, and on chunk
/// content during ingestion validation.
#[async_trait]
pub trait ContentSafety: Send + Sync {
    /// Moderate a piece of text
    async fn moderate(&self, text: &str) -> Result<Moderation>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
