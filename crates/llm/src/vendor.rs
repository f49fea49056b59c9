//! Vendor SDK adapter speaking the Anthropic Messages API shape. Grounded in
//! the teacher's Claude backend: bearer-style auth header, a fixed API
//! version header, and a `content` array of typed blocks in the response.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ragcore_core::{
    Result,
    traits::{EmbeddingProvider, GenerationParams, LlmProvider, TokenUsage},
};

use crate::error::LlmError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct VendorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl VendorConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.anthropic.com/v1".to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

pub struct VendorBackend {
    client: reqwest::Client,
    config: VendorConfig,
}

impl VendorBackend {
    pub fn new(config: VendorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::Configuration(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_k: u32,
    top_p: f32,
    messages: Vec<VendorMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Serialize)]
struct VendorMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: VendorUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct VendorUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl VendorBackend {
    async fn call_messages(&self, prompt: &str, params: &GenerationParams) -> Result<(String, TokenUsage)> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_k: params.top_k,
            top_p: params.top_p,
            messages: vec![VendorMessage { role: "user", content: prompt }],
            system: None,
        };

        let response = self
            .client
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::Request(format!("vendor returned {}", response.status())).into());
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let text = body
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or_else(|| LlmError::MalformedResponse("no text content block in response".to_string()))?;

        let usage = TokenUsage {
            prompt_tokens: body.usage.input_tokens,
            completion_tokens: body.usage.output_tokens,
        };
        Ok((text, usage))
    }
}

#[async_trait]
impl LlmProvider for VendorBackend {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<(String, TokenUsage)> {
        self.call_messages(prompt, params).await
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
        params: &GenerationParams,
    ) -> Result<(Value, TokenUsage)> {
        let schema_hint = serde_json::to_string_pretty(schema).unwrap_or_default();
        let structured_prompt = format!(
            "{prompt}\n\nRespond with only JSON matching this schema, no prose:\n{schema_hint}"
        );
        let (raw, usage) = self.call_messages(&structured_prompt, params).await?;

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
        200_000
    }
}

/// Vendor SDKs in this family do not expose an embeddings endpoint; callers
/// needing embeddings alongside a vendor LLM pair it with `HttpBackend` or
/// `LocalStubProvider` instead. This impl exists so `VendorBackend` can still
/// satisfy a generic `dyn EmbeddingProvider` slot in tests without a second
/// provider wired up, and always returns an error.
#[async_trait]
impl EmbeddingProvider for VendorBackend {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(LlmError::Configuration("vendor backend does not provide embeddings".to_string()).into())
    }

    fn dimension(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_anthropic_base_url() {
        let config = VendorConfig::new("sk-test", "claude-3-5-sonnet");
        assert_eq!(config.base_url, "https://api.anthropic.com/v1");
    }
}
