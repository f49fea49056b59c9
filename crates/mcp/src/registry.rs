//! Local tool registry: an in-process fallback for tools cheap enough not
//! to warrant a round trip through the MCP gateway (e.g. a local citation
//! formatter). Distinct from `McpGatewayClient`, which only talks to remote
//! tools.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::McpError;

#[async_trait]
pub trait LocalTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
    async fn execute(&self, arguments: Value) -> Result<Value, McpError>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn LocalTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn LocalTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn LocalTool>> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub async fn execute(&self, name: &str, arguments: Value) -> Result<Value, McpError> {
        let tool = self.tools.get(name).ok_or_else(|| McpError::Request(format!("tool not found: {name}")))?;

        match tokio::time::timeout(tool.timeout(), tool.execute(arguments)).await {
            Ok(result) => result,
            Err(_) => Err(McpError::Timeout(tool.timeout())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl LocalTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "returns its input unchanged"
        }
        async fn execute(&self, arguments: Value) -> Result<Value, McpError> {
            Ok(arguments)
        }
    }

    #[tokio::test]
    async fn registers_and_executes_a_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert!(registry.has("echo"));

        let result = registry.execute("echo", serde_json::json!({"x": 1})).await.unwrap();
        assert_eq!(result, serde_json::json!({"x": 1}));
    }

    #[tokio::test]
    async fn missing_tool_returns_error() {
        let registry = ToolRegistry::new();
        assert!(registry.execute("missing", serde_json::json!({})).await.is_err());
    }
}
