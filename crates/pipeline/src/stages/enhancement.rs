//! QueryEnhancement (spec §4.1 stage 2): normalizes the raw question and
//! decides whether chain-of-thought decomposition should engage for this
//! request. Never aborts — an unanswerable "engage CoT?" heuristic just
//! means the simple single-pass path runs instead.

use std::sync::Arc;

use async_trait::async_trait;
use ragcore_core::{Error, SearchContext};
use ragcore_cot::ChainOfThoughtEngine;

use crate::stage::{PipelineStage, StageOutcome};

pub struct QueryEnhancementStage {
    cot: Arc<ChainOfThoughtEngine>,
    cot_requested: bool,
}

impl QueryEnhancementStage {
    pub fn new(cot: Arc<ChainOfThoughtEngine>, cot_requested: bool) -> Self {
        Self { cot, cot_requested }
    }
}

#[async_trait]
impl PipelineStage for QueryEnhancementStage {
    fn name(&self) -> &str {
        "query_enhancement"
    }

    async fn execute(&self, mut ctx: SearchContext) -> StageOutcome {
        let trimmed = ctx.question.trim().to_string();
        if trimmed.is_empty() {
            return StageOutcome::Abort(Error::Validation("question must not be empty".to_string()));
        }

        let engage_cot = self.cot.should_engage(&trimmed, self.cot_requested);
        ctx.rewritten_query = Some(trimmed);
        ctx.record_stage(self.name(), serde_json::json!({ "cot_engaged": engage_cot }));
        StageOutcome::Continue(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::traits::{GenerationParams, LlmProvider, TokenUsage};
    use uuid::Uuid;

    struct StubLlm;

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> ragcore_core::Result<(String, TokenUsage)> {
            Ok((String::new(), TokenUsage::default()))
        }
        async fn generate_structured(
            &self,
            _prompt: &str,
            _schema: &serde_json::Value,
            _params: &GenerationParams,
        ) -> ragcore_core::Result<(serde_json::Value, TokenUsage)> {
            Ok((serde_json::Value::Null, TokenUsage::default()))
        }
    }

    #[tokio::test]
    async fn aborts_on_blank_question() {
        let stage = QueryEnhancementStage::new(Arc::new(ChainOfThoughtEngine::new(Arc::new(StubLlm))), false);
        let ctx = SearchContext::new("r1".into(), "   ".into(), Uuid::new_v4(), Uuid::new_v4());
        match stage.execute(ctx).await {
            StageOutcome::Abort(Error::Validation(_)) => {}
            _ => panic!("expected validation abort"),
        }
    }

    #[tokio::test]
    async fn trims_and_records_cot_decision() {
        let stage = QueryEnhancementStage::new(Arc::new(ChainOfThoughtEngine::new(Arc::new(StubLlm))), false);
        let ctx = SearchContext::new("r1".into(), "  what is gold?  ".into(), Uuid::new_v4(), Uuid::new_v4());
        match stage.execute(ctx).await {
            StageOutcome::Continue(ctx) => {
                assert_eq!(ctx.rewritten_query.as_deref(), Some("what is gold?"));
                assert!(ctx.stage_metadata.contains_key("query_enhancement"));
            }
            StageOutcome::Abort(e) => panic!("unexpected abort: {e}"),
        }
    }
}
