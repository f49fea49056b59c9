use thiserror::Error;

#[derive(Error, Debug)]
pub enum CotError {
    #[error("sub-question step failed: {0}")]
    SubStepFailed(String),

    #[error("decomposition produced no sub-questions")]
    EmptyDecomposition,
}

impl From<CotError> for ragcore_core::Error {
    fn from(err: CotError) -> Self {
        ragcore_core::Error::Internal(err.to_string())
    }
}
