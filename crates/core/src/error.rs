//! Shared error type for the RAG query-time pipeline.
//!
//! Individual crates define their own `thiserror` enums for the failures
//! specific to their domain (e.g. `RetrievalError`, `ValidationError`) and
//! convert into this type at crate boundaries, mirroring the teacher's
//! per-crate-error-converts-to-core-error pattern.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Semantic error kinds shared across the pipeline (spec §7).
#[derive(Error, Debug)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("retrieval error: {0}")]
    Retrieval(String),

    #[error("circuit open, retry in {remaining_secs:.1}s")]
    CircuitOpen { remaining_secs: f64 },

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("structured-output validation failed: {0:?}")]
    ValidationFailed(Vec<String>),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::CircuitOpen { .. } | Error::Retrieval(_))
    }
}
