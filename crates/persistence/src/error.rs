use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("invalid row data: {0}")]
    InvalidData(String),

    #[error("not found")]
    NotFound,
}

impl From<PersistenceError> for ragcore_core::Error {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound => ragcore_core::Error::NotFound("record not found".into()),
            other => ragcore_core::Error::Internal(other.to_string()),
        }
    }
}
