//! Main settings module.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            jwt_secret: default_jwt_secret(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_jwt_secret() -> String {
    std::env::var("RAGCORE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string())
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// Vector store + hybrid-retriever configuration (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_vector_endpoint")]
    pub vector_store_endpoint: String,
    #[serde(default = "default_vector_dim")]
    pub vector_dim: usize,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_dense_top_k")]
    pub dense_top_k: usize,
    #[serde(default = "default_sparse_top_k")]
    pub sparse_top_k: usize,
    #[serde(default = "default_final_top_k")]
    pub final_top_k: usize,
    /// Weight for vector score in fusion, `w` in spec §4.2 step 4.
    #[serde(default = "default_dense_weight")]
    pub dense_weight: f32,
    #[serde(default)]
    pub reranking_enabled: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            vector_store_endpoint: default_vector_endpoint(),
            vector_dim: default_vector_dim(),
            embedding_model: default_embedding_model(),
            dense_top_k: default_dense_top_k(),
            sparse_top_k: default_sparse_top_k(),
            final_top_k: default_final_top_k(),
            dense_weight: default_dense_weight(),
            reranking_enabled: true,
        }
    }
}

fn default_vector_endpoint() -> String {
    "http://localhost:6334".to_string()
}
fn default_vector_dim() -> usize {
    384
}
fn default_embedding_model() -> String {
    "local-stub".to_string()
}
fn default_dense_top_k() -> usize {
    20
}
fn default_sparse_top_k() -> usize {
    20
}
fn default_final_top_k() -> usize {
    5
}
fn default_dense_weight() -> f32 {
    0.7
}

/// MCP gateway client configuration (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default = "default_mcp_url")]
    pub gateway_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_mcp_url(),
            api_key: None,
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            health_timeout_secs: default_health_timeout_secs(),
        }
    }
}

fn default_mcp_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_recovery_timeout_secs() -> u64 {
    60
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_health_timeout_secs() -> u64 {
    5
}

/// Token tracker configuration (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokensConfig {
    #[serde(default = "default_context_window")]
    pub default_context_window: u32,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            default_context_window: default_context_window(),
        }
    }
}

fn default_context_window() -> u32 {
    4096
}

/// In-memory log ring buffer configuration (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_buffer_mb")]
    pub buffer_size_mb: usize,
    #[serde(default = "default_log_level")]
    pub default_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            buffer_size_mb: default_log_buffer_mb(),
            default_level: default_log_level(),
        }
    }
}

fn default_log_buffer_mb() -> usize {
    5
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Persistence layer configuration (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,
    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
        }
    }
}

fn default_scylla_hosts() -> Vec<String> {
    vec!["127.0.0.1:9042".to_string()]
}
fn default_scylla_keyspace() -> String {
    "ragcore".to_string()
}

/// Load settings from `config/{env}.toml` (if present) layered with
/// `RAGCORE_`-prefixed environment variables, mirroring the teacher's
/// `load_settings(env)` entry point.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let env_name = env.unwrap_or("development");
    let mut builder = Config::builder().add_source(File::with_name("config/default").required(false));
    builder = builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    builder = builder.add_source(Environment::with_prefix("RAGCORE").separator("__"));

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.retrieval.dense_weight, 0.7);
        assert_eq!(settings.mcp.failure_threshold, 5);
        assert_eq!(settings.tokens.default_context_window, 4096);
    }

    #[test]
    fn load_settings_falls_back_to_defaults_without_files() {
        let settings = load_settings(Some("nonexistent-env")).expect("load should not fail without files");
        assert_eq!(settings.server.port, 8000);
    }
}
