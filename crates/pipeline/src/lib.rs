//! Query-time pipeline orchestrator (spec §4.1): sequences the nine stages
//! that turn a question into a cited answer, threading a `SearchContext`
//! through each one.

pub mod config;
pub mod orchestrator;
pub mod stage;
pub mod stages;
pub mod templates;

pub use config::PipelineRunConfig;
pub use orchestrator::PipelineOrchestrator;
pub use stage::{Optional, PipelineStage, StageOutcome};
