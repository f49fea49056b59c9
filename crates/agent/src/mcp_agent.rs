//! A response agent that delegates artifact generation to a remote MCP
//! tool (spec §4.6+ enrichment semantics). Failures and circuit-open
//! rejections surface as a normal `ResponseAgent` error; the executor turns
//! them into a recorded failure rather than aborting the fan-out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ragcore_core::{Error, SearchContext};
use ragcore_mcp::McpGatewayClient;
use serde_json::Value;

use crate::traits::ResponseAgent;

pub struct McpResponseAgent {
    name: String,
    tool_name: String,
    client: Arc<McpGatewayClient>,
    timeout: Duration,
}

impl McpResponseAgent {
    pub fn new(name: impl Into<String>, tool_name: impl Into<String>, client: Arc<McpGatewayClient>) -> Self {
        Self { name: name.into(), tool_name: tool_name.into(), client, timeout: Duration::from_secs(10) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ResponseAgent for McpResponseAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, ctx: &SearchContext) -> Result<Value, Error> {
        let arguments = serde_json::json!({
            "question": ctx.question,
            "answer": ctx.answer_text,
        });

        let result = self.client.invoke_tool(&self.tool_name, arguments, Some(self.timeout)).await;

        if result.success {
            Ok(result.result.unwrap_or(Value::Null))
        } else {
            Err(Error::Provider(result.error.unwrap_or_else(|| "mcp tool invocation failed".into())))
        }
    }
}
