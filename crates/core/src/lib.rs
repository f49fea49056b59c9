//! Core domain types and provider traits for the RAG query-time pipeline.
//!
//! This crate provides foundational types used across all other crates:
//! - Domain model (collections, chunks, pipelines, prompt templates)
//! - The `SearchContext` threaded through pipeline stages
//! - Structured-answer and citation types
//! - Conversation session/message types
//! - Provider capability traits (`EmbeddingProvider`, `LlmProvider`, `VectorStore`)
//! - The shared error type

pub mod context;
pub mod conversation;
pub mod domain;
pub mod error;
pub mod structured;
pub mod traits;

pub use context::{AgentExecutionSummary, AgentRunStatus, AgentRunResult, QueryResult, SearchContext};
pub use conversation::{
    ConversationMessage, ConversationSession, MessageRole, MessageType, SessionStatus,
};
pub use domain::{
    Chunk, Collection, CollectionStatus, LlmParameters, Pipeline, ProviderConfig, ProviderKind,
    PromptTemplate,
};
pub use error::{Error, Result};
pub use structured::{Citation, ReasoningStep, StructuredAnswer, StructuredFormat};
pub use traits::{
    EmbeddingProvider, GenerationParams, LlmProvider, PipelineRepository, ProviderRepository,
    TokenUsage, VectorStore,
};
