//! Reranking (spec §4.1 stage 5): an optional secondary scoring pass over
//! the fused retrieval results. `HybridRetriever` is configured with its own
//! `reranking_enabled` turned off for pipeline use, so this is the only
//! place reranking happens — running it twice would double-apply the
//! lexical-overlap blend in `LexicalOverlapReranker::rerank`.

use ragcore_core::SearchContext;
use ragcore_retrieval::LexicalOverlapReranker;

use crate::stage::{PipelineStage, StageOutcome};

pub struct RerankingStage {
    enabled: bool,
}

impl RerankingStage {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait::async_trait]
impl PipelineStage for RerankingStage {
    fn name(&self) -> &str {
        "reranking"
    }

    async fn execute(&self, mut ctx: SearchContext) -> StageOutcome {
        if !self.enabled || ctx.query_results.is_empty() {
            return StageOutcome::Continue(ctx);
        }

        let query = ctx.rewritten_query.clone().unwrap_or_else(|| ctx.question.clone());
        let reranked = LexicalOverlapReranker::rerank(&query, ctx.query_results.clone());
        ctx.record_stage(self.name(), serde_json::json!({ "reranked_count": reranked.len() }));
        ctx.reranked_results = reranked;
        StageOutcome::Continue(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::{Chunk, QueryResult};
    use uuid::Uuid;

    fn qr(id: &str, text: &str, score: f32) -> QueryResult {
        QueryResult {
            chunk: Chunk {
                chunk_id: id.into(),
                document_id: "d1".into(),
                document_title: None,
                text: text.into(),
                page: None,
                ordinal: 0,
                embedding: Vec::new(),
            },
            score,
        }
    }

    #[tokio::test]
    async fn disabled_stage_leaves_reranked_results_empty() {
        let mut ctx = SearchContext::new("r1".into(), "gold loan rate".into(), Uuid::new_v4(), Uuid::new_v4());
        ctx.query_results = vec![qr("c1", "gold loan rate", 0.5)];
        let stage = RerankingStage::new(false);
        match stage.execute(ctx).await {
            StageOutcome::Continue(ctx) => assert!(ctx.reranked_results.is_empty()),
            StageOutcome::Abort(e) => panic!("unexpected abort: {e}"),
        }
    }

    #[tokio::test]
    async fn enabled_stage_preserves_result_count() {
        let mut ctx = SearchContext::new("r1".into(), "gold loan rate".into(), Uuid::new_v4(), Uuid::new_v4());
        ctx.query_results = vec![qr("c1", "gold loan rate", 0.4), qr("c2", "unrelated", 0.6)];
        let stage = RerankingStage::new(true);
        match stage.execute(ctx).await {
            StageOutcome::Continue(ctx) => assert_eq!(ctx.reranked_results.len(), 2),
            StageOutcome::Abort(e) => panic!("unexpected abort: {e}"),
        }
    }
}
