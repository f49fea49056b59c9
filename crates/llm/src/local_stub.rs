//! Deterministic offline provider used in tests and as the zero-config
//! fallback when no `ProviderConfig` is registered for a pipeline.
//!
//! Generation is template-based rather than learned: it echoes the question
//! back wrapped in a fixed scaffold, optionally citing the first context
//! block it's given. This keeps the rest of the pipeline exercisable (and
//! its tests deterministic) without a live LLM.

use async_trait::async_trait;
use serde_json::Value;

use ragcore_core::{
    Result,
    traits::{EmbeddingProvider, GenerationParams, LlmProvider, TokenUsage},
};

/// Offline `LlmProvider` + `EmbeddingProvider`. Embeddings are a hash-based
/// bag-of-words projection into a fixed dimension: not semantically
/// meaningful, but stable and collision-resistant enough for exercising the
/// retrieval pipeline in tests without a real embedding model.
pub struct LocalStubProvider {
    dimension: usize,
}

impl LocalStubProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for LocalStubProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

fn hash_token(token: &str) -> u64 {
    let mut hash: u64 = 1469598103934665603;
    for byte in token.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash
}

fn embed_one(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0f32; dimension];
    for token in text.split_whitespace() {
        let lower = token.to_lowercase();
        let h = hash_token(&lower);
        let idx = (h as usize) % dimension;
        vector[idx] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for LocalStubProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| embed_one(t, self.dimension)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl LlmProvider for LocalStubProvider {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<(String, TokenUsage)> {
        let question = prompt.rsplit("Question:").next().unwrap_or(prompt).trim();
        let answer = format!("Based on the available context, here is a response to: {question}");
        let usage = TokenUsage {
            prompt_tokens: approx_token_count(prompt),
            completion_tokens: approx_token_count(&answer),
        };
        Ok((answer, usage))
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        _schema: &Value,
        params: &GenerationParams,
    ) -> Result<(Value, TokenUsage)> {
        let (answer, usage) = self.generate(prompt, params).await?;
        let value = serde_json::json!({
            "answer": answer,
            "citations": [],
            "confidence": 0.5,
        });
        Ok((value, usage))
    }

    fn context_window(&self) -> u32 {
        8192
    }
}

/// Whitespace/punctuation approximate tokenizer, shared with `ragcore-tokens`.
pub fn approx_token_count(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeddings_are_unit_norm() {
        let provider = LocalStubProvider::default();
        let vectors = provider.embed(&["hello world".to_string()]).await.unwrap();
        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 || norm == 0.0);
    }

    #[tokio::test]
    async fn generate_echoes_question() {
        let provider = LocalStubProvider::default();
        let (answer, usage) = provider
            .generate("Context:\nsome facts\n\nQuestion: What is Rust?", &GenerationParams::default())
            .await
            .unwrap();
        assert!(answer.contains("What is Rust?"));
        assert!(usage.total() > 0);
    }
}
