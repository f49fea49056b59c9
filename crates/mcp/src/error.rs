use thiserror::Error;

#[derive(Error, Debug)]
pub enum McpError {
    #[error("request error: {0}")]
    Request(String),

    #[error("gateway returned {0}")]
    GatewayStatus(u16),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl From<McpError> for ragcore_core::Error {
    fn from(err: McpError) -> Self {
        match err {
            McpError::Timeout(d) => ragcore_core::Error::Timeout(d),
            other => ragcore_core::Error::Provider(other.to_string()),
        }
    }
}
