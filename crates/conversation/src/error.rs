use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("session {0} is not active")]
    SessionNotActive(Uuid),

    #[error("message validation failed: {0}")]
    InvalidMessage(String),

    #[error("failed to persist message pair: {0}")]
    PersistFailed(String),
}

impl From<ConversationError> for ragcore_core::Error {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::SessionNotFound(id) => ragcore_core::Error::NotFound(id.to_string()),
            ConversationError::SessionNotActive(id) => ragcore_core::Error::Validation(format!("session {id} not active")),
            ConversationError::InvalidMessage(msg) => ragcore_core::Error::Validation(msg),
            ConversationError::PersistFailed(msg) => ragcore_core::Error::Internal(msg),
        }
    }
}
