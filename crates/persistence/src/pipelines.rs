//! Per-user pipeline configuration persistence (spec §3 `Pipeline`).
//! `parameters`/`rag_template`/`question_generation_template` are stored as a
//! single JSON blob; they change together and have no query-by-field need.

use async_trait::async_trait;
use ragcore_core::domain::{LlmParameters, Pipeline, PromptTemplate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::ScyllaClient;
use crate::error::PersistenceError;

#[derive(Debug, Serialize, Deserialize)]
struct PipelineConfigBlob {
    parameters: LlmParameters,
    rag_template: PromptTemplate,
    question_generation_template: PromptTemplate,
}

#[async_trait]
pub trait PipelineRepository: Send + Sync {
    async fn upsert(&self, pipeline: &Pipeline) -> Result<(), PersistenceError>;
    async fn get(&self, user_id: Uuid, pipeline_id: Uuid) -> Result<Option<Pipeline>, PersistenceError>;
    async fn default_for_user(&self, user_id: Uuid) -> Result<Option<Pipeline>, PersistenceError>;
}

#[derive(Clone)]
pub struct ScyllaPipelineRepository {
    client: ScyllaClient,
}

impl ScyllaPipelineRepository {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    fn parse_row(
        row: (Uuid, Uuid, Uuid, String, String, bool),
    ) -> Result<Pipeline, PersistenceError> {
        let (pipeline_id, user_id, provider_id, model, config_json, is_default) = row;
        let blob: PipelineConfigBlob =
            serde_json::from_str(&config_json).map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        Ok(Pipeline {
            id: pipeline_id,
            user_id,
            provider_id,
            model,
            parameters: blob.parameters,
            rag_template: blob.rag_template,
            question_generation_template: blob.question_generation_template,
            is_default,
        })
    }
}

#[async_trait]
impl ragcore_core::PipelineRepository for ScyllaPipelineRepository {
    async fn default_for_user(&self, user_id: Uuid) -> ragcore_core::Result<Option<Pipeline>> {
        PipelineRepository::default_for_user(self, user_id).await.map_err(Into::into)
    }

    async fn get(&self, user_id: Uuid, pipeline_id: Uuid) -> ragcore_core::Result<Option<Pipeline>> {
        PipelineRepository::get(self, user_id, pipeline_id).await.map_err(Into::into)
    }

    async fn upsert(&self, pipeline: &Pipeline) -> ragcore_core::Result<()> {
        PipelineRepository::upsert(self, pipeline).await.map_err(Into::into)
    }
}

#[async_trait]
impl PipelineRepository for ScyllaPipelineRepository {
    async fn upsert(&self, pipeline: &Pipeline) -> Result<(), PersistenceError> {
        let blob = PipelineConfigBlob {
            parameters: pipeline.parameters.clone(),
            rag_template: pipeline.rag_template.clone(),
            question_generation_template: pipeline.question_generation_template.clone(),
        };
        let config_json = serde_json::to_string(&blob).map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        let query = format!(
            "INSERT INTO {}.pipelines (
                user_id, pipeline_id, provider_id, model, config_json, is_default
            ) VALUES (?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (pipeline.user_id, pipeline.id, pipeline.provider_id, pipeline.model.as_str(), config_json, pipeline.is_default),
            )
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, user_id: Uuid, pipeline_id: Uuid) -> Result<Option<Pipeline>, PersistenceError> {
        let query = format!(
            "SELECT pipeline_id, user_id, provider_id, model, config_json, is_default
             FROM {}.pipelines WHERE user_id = ? AND pipeline_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (user_id, pipeline_id))
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        let Some(rows) = result.rows else { return Ok(None) };
        let Some(row) = rows.into_iter().next() else { return Ok(None) };
        let typed = row.into_typed().map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
        Ok(Some(Self::parse_row(typed)?))
    }

    async fn default_for_user(&self, user_id: Uuid) -> Result<Option<Pipeline>, PersistenceError> {
        let query = format!(
            "SELECT pipeline_id, user_id, provider_id, model, config_json, is_default
             FROM {}.pipelines WHERE user_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (user_id,))
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        let Some(rows) = result.rows else { return Ok(None) };
        for row in rows {
            let typed: (Uuid, Uuid, Uuid, String, String, bool) =
                row.into_typed().map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
            if typed.5 {
                return Ok(Some(Self::parse_row(typed)?));
            }
        }
        Ok(None)
    }
}
