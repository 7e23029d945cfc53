//! Text-generation provider trait

use async_trait::async_trait;

use crate::error::Result;

/// Trait for the external text-generation service
///
/// Every call site must define a fallback for a failed call: the router falls
/// back to a HYBRID route, the grader to an insufficient verdict; only the
/// answer generator treats failure as fatal.
///
/// Implementations:
/// - `OllamaClient`: local Ollama server
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate free text for a prompt
    async fn generate_text(&self, prompt: &str, system_prompt: &str) -> Result<String>;

    /// Generate a JSON object for a prompt
    ///
    /// The returned value is the parsed model output; callers validate it
    /// against their own schema and fall back on mismatch.
    async fn generate_json(&self, prompt: &str, system_prompt: &str)
        -> Result<serde_json::Value>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
