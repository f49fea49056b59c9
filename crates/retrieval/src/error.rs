//! Retrieval-specific error type; converts into `ragcore_core::Error::Retrieval`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("vector store error: {0}")]
    VectorStore(String),

    #[error("sparse index error: {0}")]
    SparseIndex(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl From<RetrievalError> for ragcore_core::Error {
    fn from(err: RetrievalError) -> Self {
        ragcore_core::Error::Retrieval(err.to_string())
    }
}
