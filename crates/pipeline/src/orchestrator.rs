//! `PipelineOrchestrator`: runs the fixed nine-stage sequence (spec §4.1)
//! over a fresh `SearchContext` for one request —
//! PipelineResolution → QueryEnhancement → PreSearchAgents → Retrieval →
//! Reranking → PostSearchAgents → Generation → Validation → ResponseAgents.
//!
//! Stages are rebuilt per call (they're thin `Arc`-holding wrappers) so a
//! request's `PipelineRunConfig` can vary reranking/citation/deadline
//! behavior without the orchestrator itself carrying per-request state.

use std::sync::Arc;

use ragcore_agents::AgentExecutor;
use ragcore_core::{Error, PipelineRepository, ProviderRepository, SearchContext, traits::LlmProvider};
use ragcore_cot::ChainOfThoughtEngine;
use ragcore_retrieval::HybridRetriever;
use ragcore_validation::CitationAttributionService;
use uuid::Uuid;

use crate::config::PipelineRunConfig;
use crate::stage::{Optional, PipelineStage, StageOutcome};
use crate::stages::{
    GenerationStage, PipelineResolutionStage, PostSearchAgentsStage, PreSearchAgentsStage,
    QueryEnhancementStage, RerankingStage, ResponseAgentsStage, RetrievalStage, ValidationStage,
};

pub struct PipelineOrchestrator {
    pipelines: Arc<dyn PipelineRepository>,
    providers: Arc<dyn ProviderRepository>,
    default_model: String,
    llm: Arc<dyn LlmProvider>,
    retriever: Arc<HybridRetriever>,
    cot: Arc<ChainOfThoughtEngine>,
    attribution: Arc<CitationAttributionService>,
    agents: Arc<AgentExecutor>,
}

impl PipelineOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pipelines: Arc<dyn PipelineRepository>,
        providers: Arc<dyn ProviderRepository>,
        default_model: impl Into<String>,
        llm: Arc<dyn LlmProvider>,
        retriever: Arc<HybridRetriever>,
        cot: Arc<ChainOfThoughtEngine>,
        attribution: Arc<CitationAttributionService>,
        agents: Arc<AgentExecutor>,
    ) -> Self {
        Self {
            pipelines,
            providers,
            default_model: default_model.into(),
            llm,
            retriever,
            cot,
            attribution,
            agents,
        }
    }

    pub async fn run(
        &self,
        request_id: String,
        question: String,
        user_id: Uuid,
        collection_id: Uuid,
        config: PipelineRunConfig,
    ) -> Result<SearchContext, Error> {
        let stages: Vec<Box<dyn PipelineStage>> = vec![
            Box::new(PipelineResolutionStage::new(
                self.pipelines.clone(),
                self.providers.clone(),
                self.default_model.clone(),
            )),
            Box::new(QueryEnhancementStage::new(self.cot.clone(), config.cot_requested)),
            Box::new(PreSearchAgentsStage::new(self.agents.clone())),
            Box::new(RetrievalStage::new(self.retriever.clone())),
            Box::new(Optional(RerankingStage::new(config.reranking_enabled))),
            Box::new(PostSearchAgentsStage::new(self.agents.clone())),
            Box::new(GenerationStage::new(
                self.llm.clone(),
                self.pipelines.clone(),
                self.attribution.clone(),
                self.cot.clone(),
                config.clone(),
            )),
            // Not wrapped in `Optional`: in strict mode a validation failure
            // must actually abort the request, and `Optional` would downgrade
            // that abort back to `Continue`.
            Box::new(
                ValidationStage::new(self.attribution.clone(), config.validation_max_retries)
                    .with_strict(config.validation_strict, config.min_confidence),
            ),
            Box::new(Optional(ResponseAgentsStage::new(self.agents.clone(), config.response_agent_deadline))),
        ];

        let mut ctx = SearchContext::new(request_id, question, user_id, collection_id);

        for stage in stages {
            let name = stage.name().to_string();
            match stage.execute(ctx).await {
                StageOutcome::Continue(next) => ctx = next,
                StageOutcome::Abort(err) => {
                    tracing::warn!(stage = %name, error = %err, "pipeline request aborted");
                    return Err(err);
                }
            }
        }

        Ok(ctx)
    }
}
