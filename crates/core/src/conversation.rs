//! Conversation session/message types (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    Archived,
    Expired,
}

impl SessionStatus {
    pub fn is_writable(&self) -> bool {
        matches!(self, SessionStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub collection_id: Uuid,
    pub name: String,
    pub status: SessionStatus,
    pub context_window_size: u32,
    pub max_messages: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(user_id: Uuid, collection_id: Uuid, name: String, context_window_size: u32, max_messages: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            collection_id,
            name,
            status: SessionStatus::Active,
            context_window_size: context_window_size.max(1),
            max_messages: max_messages.max(1),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn pause(&mut self) {
        self.status = SessionStatus::Paused;
        self.updated_at = Utc::now();
    }

    pub fn resume(&mut self) {
        if matches!(self.status, SessionStatus::Paused) {
            self.status = SessionStatus::Active;
            self.updated_at = Utc::now();
        }
    }

    pub fn archive(&mut self) {
        self.status = SessionStatus::Archived;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Question,
    Answer,
    FollowUp,
    Clarification,
    SystemMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: MessageRole,
    pub message_type: MessageType,
    pub content: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    pub const MAX_CONTENT_LEN: usize = 100_000;

    pub fn validate(&self) -> Result<(), String> {
        if self.content.is_empty() {
            return Err("message content must not be empty".into());
        }
        if self.content.chars().count() > Self::MAX_CONTENT_LEN {
            return Err(format!("message content exceeds {} characters", Self::MAX_CONTENT_LEN));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_lifecycle() {
        let mut session = ConversationSession::new(Uuid::new_v4(), Uuid::new_v4(), "s".into(), 4000, 50);
        assert!(session.status.is_writable());
        session.pause();
        assert!(!session.status.is_writable());
        session.resume();
        assert!(session.status.is_writable());
        session.archive();
        assert!(!session.status.is_writable());
    }

    #[test]
    fn message_validation_rejects_empty() {
        let msg = ConversationMessage {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            role: MessageRole::User,
            message_type: MessageType::Question,
            content: String::new(),
            metadata: Value::Null,
            created_at: Utc::now(),
        };
        assert!(msg.validate().is_err());
    }
}
