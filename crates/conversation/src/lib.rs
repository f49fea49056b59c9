//! Conversation session/message persistence seams, windowed context
//! construction, and cross-turn entity carrying (spec §3, §4.5).

pub mod entity_extraction;
pub mod error;
pub mod manager;
pub mod windowing;

pub use entity_extraction::{EntityExtractor, ExtractionMethod};
pub use error::ConversationError;
pub use manager::{ConversationManager, MessageStore, PipelineOutcome, SessionStore};
pub use windowing::{build_windowed_context, concatenate_context};
