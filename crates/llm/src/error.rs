//! LLM error type; converts into `ragcore_core::Error::Provider`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("request error: {0}")]
    Request(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("schema validation failed: {0}")]
    SchemaInvalid(String),
}

impl From<LlmError> for ragcore_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(d) => ragcore_core::Error::Timeout(d),
            other => ragcore_core::Error::Provider(other.to_string()),
        }
    }
}
