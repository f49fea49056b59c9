//! Token-budget accounting: context-window usage thresholds and
//! conversation-length warnings (spec §4.7).

pub mod error;
pub mod tracker;
pub mod warning;

pub use error::TokenError;
pub use ragcore_llm::approx_token_count;
pub use tracker::{TokenTracker, DEFAULT_CONTEXT_WINDOW};
pub use warning::{Severity, TokenWarning, WarningKind, WarningStore};
