//! Registered LLM provider accounts (spec §4.1+ `ProviderConfig`), consulted
//! by pipeline resolution when a user has no default pipeline yet.

use async_trait::async_trait;
use ragcore_core::domain::{ProviderConfig, ProviderKind};
use uuid::Uuid;

use crate::client::ScyllaClient;
use crate::error::PersistenceError;

#[derive(Clone)]
pub struct ScyllaProviderRepository {
    client: ScyllaClient,
}

impl ScyllaProviderRepository {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    pub async fn upsert(&self, provider: &ProviderConfig) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.providers (
                provider_id, user_id, kind, api_key, endpoint, is_default
            ) VALUES (?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    provider.id,
                    provider.user_id,
                    kind_as_str(provider.kind),
                    provider.api_key.as_deref(),
                    provider.endpoint.as_str(),
                    provider.is_default,
                ),
            )
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        Ok(())
    }

    async fn fetch_preferred(&self, user_id: Uuid) -> Result<Option<ProviderConfig>, PersistenceError> {
        let query = format!(
            "SELECT provider_id, user_id, kind, api_key, endpoint, is_default
             FROM {}.providers WHERE user_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (user_id,))
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        let Some(rows) = result.rows else { return Ok(None) };
        let mut first: Option<ProviderConfig> = None;

        for row in rows {
            let (provider_id, user_id, kind, api_key, endpoint, is_default): (
                Uuid,
                Uuid,
                String,
                Option<String>,
                String,
                bool,
            ) = row.into_typed().map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

            let provider = ProviderConfig {
                id: provider_id,
                user_id,
                kind: kind_from_str(&kind),
                api_key,
                endpoint,
                is_default,
            };

            if provider.is_default {
                return Ok(Some(provider));
            }
            if first.is_none() {
                first = Some(provider);
            }
        }

        Ok(first)
    }
}

#[async_trait]
impl ragcore_core::ProviderRepository for ScyllaProviderRepository {
    async fn preferred_for_user(&self, user_id: Uuid) -> ragcore_core::Result<Option<ProviderConfig>> {
        self.fetch_preferred(user_id).await.map_err(Into::into)
    }
}

fn kind_as_str(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::LocalStub => "local_stub",
        ProviderKind::Http => "http",
        ProviderKind::Vendor => "vendor",
    }
}

fn kind_from_str(s: &str) -> ProviderKind {
    match s {
        "http" => ProviderKind::Http,
        "vendor" => ProviderKind::Vendor,
        _ => ProviderKind::LocalStub,
    }
}
