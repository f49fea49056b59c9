//! Structured-answer validation and post-hoc citation attribution.

pub mod attribution;
pub mod error;
pub mod validator;

pub use attribution::CitationAttributionService;
pub use error::ValidationError;
pub use validator::{ValidationIssue, ValidationReport, validate_answer, validate_with_retry};
