//! ScyllaDB-backed storage for the RAG query-time service: conversation
//! sessions/messages, token-warning history, and per-user pipeline configs.

pub mod client;
pub mod error;
pub mod messages;
pub mod pipelines;
pub mod providers;
pub mod schema;
pub mod sessions;
pub mod token_warnings;

pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;
pub use messages::ScyllaMessageStore;
pub use pipelines::{PipelineRepository, ScyllaPipelineRepository};
pub use providers::ScyllaProviderRepository;
pub use sessions::ScyllaSessionStore;
pub use token_warnings::{ScyllaTokenWarningRepository, TokenWarningRepository};

/// Connects, ensures schema, and wires up every store.
pub async fn init(config: ScyllaConfig) -> Result<PersistenceLayer, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;

    Ok(PersistenceLayer {
        sessions: ScyllaSessionStore::new(client.clone()),
        messages: ScyllaMessageStore::new(client.clone()),
        token_warnings: ScyllaTokenWarningRepository::new(client.clone()),
        pipelines: ScyllaPipelineRepository::new(client.clone()),
        providers: ScyllaProviderRepository::new(client),
    })
}

pub struct PersistenceLayer {
    pub sessions: ScyllaSessionStore,
    pub messages: ScyllaMessageStore,
    pub token_warnings: ScyllaTokenWarningRepository,
    pub pipelines: ScyllaPipelineRepository,
    pub providers: ScyllaProviderRepository,
}
