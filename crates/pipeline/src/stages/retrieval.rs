//! Retrieval (spec §4.1 stage 4): embeds the (possibly rewritten) query and
//! runs hybrid dense+sparse search. The collection's vector index is
//! addressed by `collection_id` directly — collection/document management
//! is out of scope (spec §3), so there is no separate lookup from
//! `collection_id` to an index name.

use std::sync::Arc;

use async_trait::async_trait;
use ragcore_core::{Error, SearchContext};
use ragcore_retrieval::HybridRetriever;

use crate::stage::{PipelineStage, StageOutcome};

pub struct RetrievalStage {
    retriever: Arc<HybridRetriever>,
}

impl RetrievalStage {
    pub fn new(retriever: Arc<HybridRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl PipelineStage for RetrievalStage {
    fn name(&self) -> &str {
        "retrieval"
    }

    async fn execute(&self, mut ctx: SearchContext) -> StageOutcome {
        let query = ctx.rewritten_query.clone().unwrap_or_else(|| ctx.question.clone());

        let embedding = match self.retriever.embed_query(&query).await {
            Ok(embedding) => embedding,
            Err(err) => return StageOutcome::Abort(Error::Retrieval(err.to_string())),
        };

        let index_name = ctx.collection_id.to_string();
        match self.retriever.search(&index_name, &query, &embedding, None).await {
            Ok(results) => {
                ctx.record_stage(self.name(), serde_json::json!({ "result_count": results.len() }));
                ctx.query_results = results;
                StageOutcome::Continue(ctx)
            }
            Err(err) => StageOutcome::Abort(Error::Retrieval(err.to_string())),
        }
    }
}
