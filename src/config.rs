//! Configuration for the retrieval pipeline

use serde::{Deserialize, Serialize};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Fusion weight configuration
    pub fusion: FusionConfig,
    /// Relevance grading configuration
    pub grading: GradingConfig,
    /// Orchestrator configuration
    pub orchestrator: OrchestratorConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks to fetch from each channel before fusion
    pub channel_top_k: usize,
    /// Number of fused chunks handed to grading and generation
    pub context_top_k: usize,
    /// BM25 k1 parameter (term-frequency saturation)
    pub bm25_k1: f32,
    /// BM25 b parameter (length normalization)
    pub bm25_b: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            channel_top_k: 20,
            context_top_k: 5,
            bm25_k1: 1.2,
            bm25_b: 0.75,
        }
    }
}

/// Per-channel weights used when fusing keyword and vector results
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FusionWeights {
    /// Weight applied to the normalized keyword score
    pub keyword: f32,
    /// Weight applied to the normalized vector score
    pub vector: f32,
}

/// Fusion configuration: one weight preset per route kind
///
/// Weights are deployment tunables, not code. Detail questions lean on exact
/// term overlap; meta/summary questions lean on semantic similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Weights for DETAIL-routed queries
    pub detail: FusionWeights,
    /// Weights for META-routed queries
    pub meta: FusionWeights,
    /// Weights for HYBRID-routed queries (also the fallback preset)
    pub hybrid: FusionWeights,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            detail: FusionWeights { keyword: 0.65, vector: 0.35 },
            meta: FusionWeights { keyword: 0.25, vector: 0.75 },
            hybrid: FusionWeights { keyword: 0.4, vector: 0.6 },
        }
    }
}

/// Relevance grading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Number of top fused chunks shown to the grader
    pub top_n: usize,
    /// Characters of each chunk included in the grading prompt
    pub preview_chars: usize,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            preview_chars: 400,
            timeout_secs: 30,
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum corrective retrieval retries before generating best-effort
    pub max_retries: u32,
    /// Per-call timeout for routing in seconds
    pub routing_timeout_secs: u64,
    /// Per-call timeout for the vector search channel in seconds
    pub retrieval_timeout_secs: u64,
    /// Per-call timeout for answer generation in seconds
    pub generation_timeout_secs: u64,
    /// Per-call timeout for the safety check in seconds
    pub safety_timeout_secs: u64,
    /// Per-call timeout for vector-store writes during ingestion in seconds
    pub indexing_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            routing_timeout_secs: 30,
            retrieval_timeout_secs: 30,
            generation_timeout_secs: 120,
            safety_timeout_secs: 30,
            indexing_timeout_secs: 60,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Minimum chunk size (smaller chunks are dropped during chunking)
    pub min_chunk_size: usize,
    /// Maximum chunk size accepted by validation
    pub max_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
            min_chunk_size: 50,
            max_chunk_size: 8192,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3.1".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one_per_preset() {
        let config = FusionConfig::default();
        for preset in [config.detail, config.meta, config.hybrid] {
            assert!((preset.keyword + preset.vector - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn config_serialization_roundtrip() {
        let config = RagConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RagConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.orchestrator.max_retries, 2);
        assert_eq!(parsed.chunking.chunk_size, 1024);
    }
}
