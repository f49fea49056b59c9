pub mod agents;
pub mod enhancement;
pub mod generation;
pub mod reranking;
pub mod resolution;
pub mod retrieval;
pub mod validation;

pub use agents::{PostSearchAgentsStage, PreSearchAgentsStage, ResponseAgentsStage};
pub use enhancement::QueryEnhancementStage;
pub use generation::GenerationStage;
pub use reranking::RerankingStage;
pub use resolution::PipelineResolutionStage;
pub use retrieval::RetrievalStage;
pub use validation::ValidationStage;
