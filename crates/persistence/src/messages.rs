//! Conversation message persistence (spec §3 `ConversationMessage`).
//! Turn writes use a logged batch so a user/assistant pair is never split.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ragcore_conversation::MessageStore as MessageStoreTrait;
use ragcore_core::{ConversationMessage, MessageRole, MessageType};
use scylla::batch::Batch;
use uuid::Uuid;

use crate::client::ScyllaClient;
use crate::error::PersistenceError;

#[derive(Clone)]
pub struct ScyllaMessageStore {
    client: ScyllaClient,
}

impl ScyllaMessageStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    async fn fetch_recent(&self, session_id: Uuid, limit: usize) -> Result<Vec<ConversationMessage>, PersistenceError> {
        let query = format!(
            "SELECT message_id, session_id, role, message_type, content, metadata_json, created_at
             FROM {}.conversation_messages WHERE session_id = ? LIMIT ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (session_id, limit as i32))
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        let Some(rows) = result.rows else { return Ok(Vec::new()) };
        let mut messages = Vec::with_capacity(rows.len());

        for row in rows {
            let (message_id, session_id, role, message_type, content, metadata_json, created_at): (
                Uuid,
                Uuid,
                String,
                String,
                String,
                Option<String>,
                i64,
            ) = row.into_typed().map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

            messages.push(ConversationMessage {
                id: message_id,
                session_id,
                role: role_from_str(&role),
                message_type: type_from_str(&message_type),
                content,
                metadata: metadata_json.and_then(|s| serde_json::from_str(&s).ok()).unwrap_or(serde_json::Value::Null),
                created_at: from_millis(created_at),
            });
        }

        // Rows come back newest-first (clustering order); restore chronological order.
        messages.reverse();
        Ok(messages)
    }

    async fn insert_pair(&self, user: ConversationMessage, assistant: ConversationMessage) -> Result<(), PersistenceError> {
        let insert_cql = format!(
            "INSERT INTO {}.conversation_messages (
                session_id, message_id, role, message_type, content, metadata_json, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        let mut batch: Batch = Default::default();
        batch.append_statement(insert_cql.as_str());
        batch.append_statement(insert_cql.as_str());

        let values = (message_row(&user), message_row(&assistant));

        self.client
            .session()
            .batch(&batch, values)
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        Ok(())
    }
}

type MessageRow = (Uuid, Uuid, &'static str, &'static str, String, Option<String>, i64);

fn message_row(message: &ConversationMessage) -> MessageRow {
    (
        message.session_id,
        message.id,
        role_as_str(message.role),
        type_as_str(message.message_type),
        message.content.clone(),
        if message.metadata.is_null() { None } else { Some(message.metadata.to_string()) },
        message.created_at.timestamp_millis(),
    )
}

#[async_trait]
impl MessageStoreTrait for ScyllaMessageStore {
    async fn recent_messages(&self, session_id: Uuid, limit: usize) -> Result<Vec<ConversationMessage>, ragcore_core::Error> {
        self.fetch_recent(session_id, limit).await.map_err(Into::into)
    }

    async fn persist_pair(&self, user_message: ConversationMessage, assistant_message: ConversationMessage) -> Result<(), ragcore_core::Error> {
        self.insert_pair(user_message, assistant_message).await.map_err(Into::into)
    }
}

fn role_as_str(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
    }
}

fn role_from_str(s: &str) -> MessageRole {
    match s {
        "assistant" => MessageRole::Assistant,
        "system" => MessageRole::System,
        _ => MessageRole::User,
    }
}

fn type_as_str(message_type: MessageType) -> &'static str {
    match message_type {
        MessageType::Question => "question",
        MessageType::Answer => "answer",
        MessageType::FollowUp => "follow_up",
        MessageType::Clarification => "clarification",
        MessageType::SystemMessage => "system_message",
    }
}

fn type_from_str(s: &str) -> MessageType {
    match s {
        "answer" => MessageType::Answer,
        "follow_up" => MessageType::FollowUp,
        "clarification" => MessageType::Clarification,
        "system_message" => MessageType::SystemMessage,
        _ => MessageType::Question,
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}
