//! Configuration management for the RAG query-time pipeline.
//!
//! Loads from a TOML/YAML file layered with `RAGCORE_`-prefixed environment
//! variable overrides, the way the teacher's `load_settings` does for
//! `voice-agent-config`.

pub mod settings;

pub use settings::{
    LoggingConfig, McpConfig, PersistenceConfig, RetrievalConfig, RuntimeEnvironment,
    ServerConfig, Settings, TokensConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
