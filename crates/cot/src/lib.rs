//! Chain-of-thought question decomposition: breaks a complex question into
//! sub-questions, answers each through the caller's retrieval+generation
//! step, and synthesizes a final answer.

pub mod cleanup;
pub mod engine;
pub mod error;
pub mod heuristic;

pub use cleanup::clean_answer;
pub use engine::{ChainOfThoughtEngine, SubQuestionAnswer, DEFAULT_MAX_SUB_QUESTIONS};
pub use error::CotError;
pub use heuristic::{ComplexityHeuristic, DefaultComplexityHeuristic};
