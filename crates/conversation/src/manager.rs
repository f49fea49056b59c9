//! Per-turn orchestration (spec §4.5): load session, reject if not
//! active, build windowed context, carry entities, invoke the pipeline,
//! persist the turn as an atomic pair.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use ragcore_core::{Citation, ConversationMessage, ConversationSession, MessageRole, MessageType};
use serde_json::Value;
use uuid::Uuid;

use crate::entity_extraction::{EntityExtractor, ExtractionMethod};
use crate::error::ConversationError;
use crate::windowing::{build_windowed_context, concatenate_context};

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: Uuid) -> Result<Option<ConversationSession>, ragcore_core::Error>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn recent_messages(&self, session_id: Uuid, limit: usize) -> Result<Vec<ConversationMessage>, ragcore_core::Error>;

    /// Persists both messages or neither (spec §4.5 atomic-pair invariant).
    async fn persist_pair(
        &self,
        user_message: ConversationMessage,
        assistant_message: ConversationMessage,
    ) -> Result<(), ragcore_core::Error>;
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub answer: String,
    pub sources: Vec<Citation>,
    pub token_count: u32,
}

pub struct ConversationManager {
    sessions: Arc<dyn SessionStore>,
    messages: Arc<dyn MessageStore>,
    entities: EntityExtractor,
    extraction_method: ExtractionMethod,
    max_entities: usize,
}

impl ConversationManager {
    pub fn new(sessions: Arc<dyn SessionStore>, messages: Arc<dyn MessageStore>, entities: EntityExtractor) -> Self {
        Self { sessions, messages, entities, extraction_method: ExtractionMethod::Hybrid, max_entities: 10 }
    }

    pub fn with_extraction(mut self, method: ExtractionMethod, max_entities: usize) -> Self {
        self.extraction_method = method;
        self.max_entities = max_entities;
        self
    }

    pub async fn handle_turn<F, Fut>(
        &self,
        session_id: Uuid,
        user_input: String,
        invoke_pipeline: F,
    ) -> Result<ConversationMessage, ConversationError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<PipelineOutcome, ragcore_core::Error>>,
    {
        let session = self.sessions.get(session_id).await.map_err(|e| ConversationError::PersistFailed(e.to_string()))?;
        let session = session.ok_or(ConversationError::SessionNotFound(session_id))?;

        if !session.status.is_writable() {
            return Err(ConversationError::SessionNotActive(session_id));
        }

        let history = self
            .messages
            .recent_messages(session_id, session.max_messages as usize)
            .await
            .map_err(|e| ConversationError::PersistFailed(e.to_string()))?;
        let windowed = build_windowed_context(&history, session.context_window_size);
        let context_text = concatenate_context(&windowed);

        let entities = self.entities.extract(&context_text, self.extraction_method, self.max_entities).await;
        let augmented_query = augment_with_entities(&user_input, &entities);

        let outcome = invoke_pipeline(augmented_query)
            .await
            .map_err(|e| ConversationError::PersistFailed(e.to_string()))?;

        let user_message = ConversationMessage {
            id: Uuid::new_v4(),
            session_id,
            role: MessageRole::User,
            message_type: MessageType::Question,
            content: user_input,
            metadata: Value::Null,
            created_at: chrono::Utc::now(),
        };
        user_message.validate().map_err(ConversationError::InvalidMessage)?;

        let assistant_message = ConversationMessage {
            id: Uuid::new_v4(),
            session_id,
            role: MessageRole::Assistant,
            message_type: MessageType::Answer,
            content: outcome.answer,
            metadata: serde_json::json!({
                "sources": outcome.sources,
                "token_count": outcome.token_count,
            }),
            created_at: chrono::Utc::now(),
        };
        assistant_message.validate().map_err(ConversationError::InvalidMessage)?;

        self.messages
            .persist_pair(user_message, assistant_message.clone())
            .await
            .map_err(|e| ConversationError::PersistFailed(e.to_string()))?;

        Ok(assistant_message)
    }
}

fn augment_with_entities(query: &str, entities: &[String]) -> String {
    let query_lower = query.to_lowercase();
    let missing: Vec<&String> = entities.iter().filter(|e| !query_lower.contains(&e.to_lowercase())).collect();

    if missing.is_empty() {
        return query.to_string();
    }

    let joined = missing.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
    format!("{query}\n\n(carried context: {joined})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    struct FakeSessions(Mutex<HashMap<Uuid, ConversationSession>>);

    #[async_trait]
    impl SessionStore for FakeSessions {
        async fn get(&self, session_id: Uuid) -> Result<Option<ConversationSession>, ragcore_core::Error> {
            Ok(self.0.lock().get(&session_id).cloned())
        }
    }

    #[derive(Default)]
    struct FakeMessages {
        history: Mutex<Vec<ConversationMessage>>,
        persisted_pairs: Mutex<usize>,
    }

    #[async_trait]
    impl MessageStore for FakeMessages {
        async fn recent_messages(&self, _session_id: Uuid, _limit: usize) -> Result<Vec<ConversationMessage>, ragcore_core::Error> {
            Ok(self.history.lock().clone())
        }

        async fn persist_pair(
            &self,
            _user_message: ConversationMessage,
            _assistant_message: ConversationMessage,
        ) -> Result<(), ragcore_core::Error> {
            *self.persisted_pairs.lock() += 1;
            Ok(())
        }
    }

    fn active_session() -> ConversationSession {
        ConversationSession::new(Uuid::new_v4(), Uuid::new_v4(), "s".into(), 4000, 50)
    }

    #[tokio::test]
    async fn rejects_turn_on_missing_session() {
        let sessions = Arc::new(FakeSessions(Mutex::new(HashMap::new())));
        let messages = Arc::new(FakeMessages::default());
        let manager = ConversationManager::new(sessions, messages, EntityExtractor::new(None));

        let result = manager.handle_turn(Uuid::new_v4(), "hi".into(), |q| async move {
            Ok(PipelineOutcome { answer: q, sources: vec![], token_count: 1 })
        }).await;

        assert!(matches!(result, Err(ConversationError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn rejects_turn_on_paused_session() {
        let mut session = active_session();
        session.pause();
        let id = session.id;
        let sessions = Arc::new(FakeSessions(Mutex::new(HashMap::from([(id, session)]))));
        let messages = Arc::new(FakeMessages::default());
        let manager = ConversationManager::new(sessions, messages, EntityExtractor::new(None));

        let result = manager.handle_turn(id, "hi".into(), |q| async move {
            Ok(PipelineOutcome { answer: q, sources: vec![], token_count: 1 })
        }).await;

        assert!(matches!(result, Err(ConversationError::SessionNotActive(_))));
    }

    #[tokio::test]
    async fn happy_path_persists_one_pair_and_returns_assistant_message() {
        let session = active_session();
        let id = session.id;
        let sessions = Arc::new(FakeSessions(Mutex::new(HashMap::from([(id, session)]))));
        let messages = Arc::new(FakeMessages::default());
        let manager = ConversationManager::new(sessions, messages.clone(), EntityExtractor::new(None));

        let result = manager
            .handle_turn(id, "what is the refund policy".into(), |q| async move {
                Ok(PipelineOutcome { answer: format!("answer to: {q}"), sources: vec![], token_count: 42 })
            })
            .await
            .unwrap();

        assert!(result.content.starts_with("answer to:"));
        assert_eq!(*messages.persisted_pairs.lock(), 1);
    }
}
