//! Generic REST backend for self-hosted/local model servers speaking an
//! Ollama-shaped `/api/generate` and `/api/embeddings` contract. Grounded in
//! the teacher's Ollama backend adapter: a thin reqwest client, JSON in/out,
//! one retry-free request per call with a hard timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use ragcore_core::{
    Result,
    traits::{EmbeddingProvider, GenerationParams, LlmProvider, TokenUsage},
};

use crate::error::LlmError;
use crate::local_stub::approx_token_count;

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_model: Option<String>,
    pub request_timeout: Duration,
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            embedding_model: None,
            request_timeout: Duration::from_secs(60),
        }
    }
}

pub struct HttpBackend {
    client: reqwest::Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    repeat_penalty: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl LlmProvider for HttpBackend {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<(String, TokenUsage)> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: params.temperature,
                top_k: params.top_k,
                top_p: params.top_p,
                repeat_penalty: params.repetition_penalty,
                num_predict: params.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.config.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::Request(format!("backend returned {}", response.status())).into());
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let usage = TokenUsage {
            prompt_tokens: body.prompt_eval_count.unwrap_or_else(|| approx_token_count(prompt)),
            completion_tokens: body.eval_count.unwrap_or_else(|| approx_token_count(&body.response)),
        };
        Ok((body.response, usage))
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
        params: &GenerationParams,
    ) -> Result<(Value, TokenUsage)> {
        let schema_hint = serde_json::to_string_pretty(schema).unwrap_or_default();
        let structured_prompt =
            format!("{prompt}\n\nRespond with JSON matching this schema exactly:\n{schema_hint}");
        let (raw, usage) = self.generate(&structured_prompt, params).await?;

        let trimmed = raw.trim();
        let json_start = trimmed.find('{').unwrap_or(0);
        let json_end = trimmed.rfind('}').map(|i| i + 1).unwrap_or(trimmed.len());
        let candidate = &trimmed[json_start..json_end];

        let value: Value = serde_json::from_str(candidate)
            .map_err(|e| LlmError::MalformedResponse(format!("not valid JSON: {e}")))?;

        jsonschema::validator_for(schema)
            .map_err(|e| LlmError::SchemaInvalid(e.to_string()))?
            .validate(&value)
            .map_err(|e| LlmError::SchemaInvalid(e.to_string()))?;

        Ok((value, usage))
    }

    fn context_window(&self) -> u32 {
        4096
    }
}

#[async_trait]
impl EmbeddingProvider for HttpBackend {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self
            .config
            .embedding_model
            .as_deref()
            .unwrap_or(&self.config.model);

        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let request = EmbeddingsRequest { model, prompt: text };
            let response = self
                .client
                .post(format!("{}/api/embeddings", self.config.base_url))
                .json(&request)
                .send()
                .await
                .map_err(|e| LlmError::Request(e.to_string()))?;

            if !response.status().is_success() {
                return Err(LlmError::Request(format!("backend returned {}", response.status())).into());
            }

            let body: EmbeddingsResponse = response
                .json()
                .await
                .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
            out.push(body.embedding);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        384
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_sixty_second_timeout() {
        let config = HttpBackendConfig::new("http://localhost:11434", "llama3");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }
}
