//! Conversation session persistence (spec §3 `ConversationSession`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ragcore_conversation::SessionStore as SessionStoreTrait;
use ragcore_core::{ConversationSession, SessionStatus};
use uuid::Uuid;

use crate::client::ScyllaClient;
use crate::error::PersistenceError;

#[derive(Clone)]
pub struct ScyllaSessionStore {
    client: ScyllaClient,
}

impl ScyllaSessionStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, session: &ConversationSession) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.conversation_sessions (
                session_id, user_id, collection_id, name, status,
                context_window_size, max_messages, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    session.id,
                    session.user_id,
                    session.collection_id,
                    session.name.as_str(),
                    status_as_str(session.status),
                    session.context_window_size as i32,
                    session.max_messages as i32,
                    session.created_at.timestamp_millis(),
                    session.updated_at.timestamp_millis(),
                ),
            )
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        Ok(())
    }

    pub async fn update_status(&self, session_id: Uuid, status: SessionStatus) -> Result<(), PersistenceError> {
        let query = format!(
            "UPDATE {}.conversation_sessions SET status = ?, updated_at = ? WHERE session_id = ?",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(query, (status_as_str(status), Utc::now().timestamp_millis(), session_id))
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        Ok(())
    }

    async fn fetch(&self, session_id: Uuid) -> Result<Option<ConversationSession>, PersistenceError> {
        let query = format!(
            "SELECT session_id, user_id, collection_id, name, status,
                    context_window_size, max_messages, created_at, updated_at
             FROM {}.conversation_sessions WHERE session_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (session_id,))
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        let Some(rows) = result.rows else { return Ok(None) };
        let Some(row) = rows.into_iter().next() else { return Ok(None) };

        let (session_id, user_id, collection_id, name, status, context_window_size, max_messages, created_at, updated_at): (
            Uuid,
            Uuid,
            Uuid,
            String,
            String,
            i32,
            i32,
            i64,
            i64,
        ) = row.into_typed().map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        Ok(Some(ConversationSession {
            id: session_id,
            user_id,
            collection_id,
            name,
            status: status_from_str(&status),
            context_window_size: context_window_size as u32,
            max_messages: max_messages as u32,
            created_at: from_millis(created_at),
            updated_at: from_millis(updated_at),
        }))
    }
}

#[async_trait]
impl SessionStoreTrait for ScyllaSessionStore {
    async fn get(&self, session_id: Uuid) -> Result<Option<ConversationSession>, ragcore_core::Error> {
        self.fetch(session_id).await.map_err(Into::into)
    }
}

fn status_as_str(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Active => "active",
        SessionStatus::Paused => "paused",
        SessionStatus::Archived => "archived",
        SessionStatus::Expired => "expired",
    }
}

fn status_from_str(s: &str) -> SessionStatus {
    match s {
        "paused" => SessionStatus::Paused,
        "archived" => SessionStatus::Archived,
        "expired" => SessionStatus::Expired,
        _ => SessionStatus::Active,
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}
