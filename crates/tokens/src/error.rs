use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("warning not found: {0}")]
    NotFound(uuid::Uuid),
}

impl From<TokenError> for ragcore_core::Error {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::NotFound(id) => ragcore_core::Error::NotFound(id.to_string()),
        }
    }
}
