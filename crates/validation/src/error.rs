use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("dimension mismatch comparing embeddings: {0} != {1}")]
    DimensionMismatch(usize, usize),
}

impl From<ValidationError> for ragcore_core::Error {
    fn from(err: ValidationError) -> Self {
        ragcore_core::Error::Internal(err.to_string())
    }
}
