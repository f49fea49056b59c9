//! Resilient HTTP client for the MCP tool gateway: bounded-latency tool
//! invocation with circuit-breaker fault isolation and graceful degradation
//! (failures return an error result, never propagate past the gateway
//! boundary into the core search flow).

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::McpError;

#[derive(Debug, Clone)]
pub struct McpClientConfig {
    pub gateway_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub health_check_timeout: Duration,
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
}

impl Default for McpClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8080".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(30),
            health_check_timeout: Duration::from_secs(5),
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ToolResult {
    fn failure(tool: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self { tool: tool.into(), success: false, result: None, error: Some(error.into()), duration_ms }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub input_schema: Value,
}

#[derive(Deserialize)]
struct ListToolsResponse {
    #[serde(default)]
    tools: Vec<ToolDescription>,
}

pub struct McpGatewayClient {
    http: reqwest::Client,
    config: McpClientConfig,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl McpGatewayClient {
    pub fn new(config: McpClientConfig) -> Result<Self, McpError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(ref api_key) = config.api_key {
            let value = format!("Bearer {api_key}");
            if let Ok(header_value) = reqwest::header::HeaderValue::from_str(&value) {
                headers.insert(reqwest::header::AUTHORIZATION, header_value);
            }
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| McpError::Request(e.to_string()))?;

        let circuit_breaker = Arc::new(CircuitBreaker::new(config.failure_threshold, config.recovery_timeout));

        Ok(Self { http, config, circuit_breaker })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.config.gateway_url);
        match self.http.get(&url).timeout(self.config.health_check_timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    pub async fn list_tools(&self) -> Vec<ToolDescription> {
        if self.circuit_breaker.can_execute().is_err() {
            return Vec::new();
        }

        let url = format!("{}/tools", self.config.gateway_url);
        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => match response.json::<ListToolsResponse>().await {
                Ok(body) => {
                    self.circuit_breaker.record_success();
                    body.tools
                }
                Err(_) => {
                    self.circuit_breaker.record_failure();
                    Vec::new()
                }
            },
            _ => {
                self.circuit_breaker.record_failure();
                Vec::new()
            }
        }
    }

    pub async fn invoke_tool(&self, name: &str, arguments: Value, timeout: Option<Duration>) -> ToolResult {
        let start = Instant::now();

        if let Err(err) = self.circuit_breaker.can_execute() {
            return ToolResult::failure(name, err.to_string(), 0);
        }

        let request_timeout = timeout.unwrap_or(self.config.request_timeout);
        let url = format!("{}/tools/{name}/invoke", self.config.gateway_url);

        let response = self
            .http
            .post(&url)
            .timeout(request_timeout)
            .json(&serde_json::json!({ "arguments": arguments }))
            .send()
            .await;

        let duration_ms = start.elapsed().as_millis() as u64;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(value) => {
                    self.circuit_breaker.record_success();
                    ToolResult { tool: name.to_string(), success: true, result: Some(value), error: None, duration_ms }
                }
                Err(err) => {
                    self.circuit_breaker.record_failure();
                    ToolResult::failure(name, err.to_string(), duration_ms)
                }
            },
            Ok(resp) => {
                self.circuit_breaker.record_failure();
                ToolResult::failure(name, format!("gateway returned {}", resp.status()), duration_ms)
            }
            Err(err) if err.is_timeout() => {
                self.circuit_breaker.record_failure();
                ToolResult::failure(name, format!("timeout after {request_timeout:?}"), duration_ms)
            }
            Err(err) => {
                self.circuit_breaker.record_failure();
                ToolResult::failure(name, err.to_string(), duration_ms)
            }
        }
    }

    /// Invokes every `(name, arguments)` pair concurrently; the returned
    /// vector preserves input order regardless of completion order.
    pub async fn invoke_tools_parallel(
        &self,
        invocations: Vec<(String, Value)>,
        timeout: Option<Duration>,
    ) -> Vec<ToolResult> {
        let futures = invocations.into_iter().map(|(name, args)| self.invoke_tool(&name, args, timeout));
        futures::future::join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invoke_tool_short_circuits_when_breaker_open() {
        let config = McpClientConfig { failure_threshold: 1, ..McpClientConfig::default() };
        let client = McpGatewayClient::new(config).unwrap();
        client.circuit_breaker.record_failure();

        let result = client.invoke_tool("powerpoint", serde_json::json!({}), None).await;
        assert!(!result.success);
        assert_eq!(result.duration_ms, 0);
    }

    #[tokio::test]
    async fn parallel_invocations_preserve_order() {
        let config = McpClientConfig { failure_threshold: 1, ..McpClientConfig::default() };
        let client = McpGatewayClient::new(config).unwrap();
        client.circuit_breaker.record_failure();

        let invocations = vec![
            ("tool_a".to_string(), serde_json::json!({})),
            ("tool_b".to_string(), serde_json::json!({})),
            ("tool_c".to_string(), serde_json::json!({})),
        ];
        let results = client.invoke_tools_parallel(invocations, None).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].tool, "tool_a");
        assert_eq!(results[1].tool, "tool_b");
        assert_eq!(results[2].tool, "tool_c");
    }
}
