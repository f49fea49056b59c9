//! LLM and embedding provider adapters.
//!
//! Implements the capability traits from `ragcore_core::traits`
//! (`LlmProvider`, `EmbeddingProvider`) with three variants, per spec §9:
//! - [`local_stub`]: deterministic, offline — used in tests and as a
//!   fallback when no provider is configured.
//! - [`http_backend`]: a generic REST backend (Ollama-shaped request/response),
//!   grounded in the teacher's `backend::OllamaBackend`.
//! - [`vendor`]: an Anthropic-Messages-API-shaped adapter, grounded in the
//!   teacher's `claude::ClaudeBackend`.

pub mod embeddings;
pub mod error;
pub mod factory;
pub mod http_backend;
pub mod local_stub;
pub mod prompt;
pub mod vendor;

pub use error::LlmError;
pub use factory::{LlmProviderConfig, LlmProviderKind, create_provider};
pub use local_stub::approx_token_count;
pub use prompt::{Message, PromptBuilder, Role};
