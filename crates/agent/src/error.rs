use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("agent {0} failed: {1}")]
    Failed(String, String),
}

impl From<AgentError> for ragcore_core::Error {
    fn from(err: AgentError) -> Self {
        ragcore_core::Error::Provider(err.to_string())
    }
}
