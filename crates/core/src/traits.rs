//! Explicit provider capability traits (spec §9 "Duck-typed provider
//! interfaces"). Variants (local-stub, remote-HTTP, vendor-SDK adapter) live
//! in `ragcore-llm`; this crate only defines the seams.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use uuid::Uuid;

use crate::domain::{Chunk, Pipeline, ProviderConfig};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_k: u32,
    pub top_p: f32,
    pub repetition_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            top_k: 50,
            top_p: 0.9,
            repetition_penalty: 1.0,
        }
    }
}

/// `embed(texts) -> [vector]`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;
}

/// `generate(prompt, params) -> (text, usage)` and
/// `generate_structured(prompt, schema, params) -> (structured, usage)`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<(String, TokenUsage)>;

    /// Generate JSON conforming to `schema`. Implementations validate with
    /// `jsonschema` and return `Error::Provider` on malformed output (the
    /// validator in `ragcore-validation` handles the semantic retry loop;
    /// this only guarantees syntactic/schema conformance).
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
        params: &GenerationParams,
    ) -> Result<(Value, TokenUsage)>;

    /// The provider's context window in tokens, for token-tracker lookups.
    fn context_window(&self) -> u32 {
        4096
    }
}

/// Vector similarity search over a named collection index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn search(&self, index: &str, embedding: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>>;

    async fn upsert(&self, index: &str, chunks: &[Chunk]) -> Result<()>;
}

/// Per-user pipeline configuration lookup/creation (spec §4.1 PipelineResolution).
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    async fn default_for_user(&self, user_id: Uuid) -> Result<Option<Pipeline>>;

    async fn get(&self, user_id: Uuid, pipeline_id: Uuid) -> Result<Option<Pipeline>>;

    async fn upsert(&self, pipeline: &Pipeline) -> Result<()>;
}

/// A user's registered LLM provider accounts, consulted when no default
/// pipeline exists yet (spec §4.1 PipelineResolution "obtain the user's
/// preferred provider").
#[async_trait]
pub trait ProviderRepository: Send + Sync {
    async fn preferred_for_user(&self, user_id: Uuid) -> Result<Option<ProviderConfig>>;
}
