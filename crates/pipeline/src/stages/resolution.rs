//! PipelineResolution (spec §4.1 stage 1): finds the requesting user's
//! default `Pipeline`, or creates and persists one from their preferred
//! provider if they don't have one yet. Hard failure (no provider on file)
//! aborts the request; there is no sensible fallback for "generate an
//! answer with no model configured".

use std::sync::Arc;

use async_trait::async_trait;
use ragcore_core::{Error, LlmParameters, Pipeline, PipelineRepository, ProviderRepository, SearchContext};
use uuid::Uuid;

use crate::stage::{PipelineStage, StageOutcome};
use crate::templates::{default_question_generation_template, default_rag_template};

pub struct PipelineResolutionStage {
    pipelines: Arc<dyn PipelineRepository>,
    providers: Arc<dyn ProviderRepository>,
    default_model: String,
}

impl PipelineResolutionStage {
    pub fn new(
        pipelines: Arc<dyn PipelineRepository>,
        providers: Arc<dyn ProviderRepository>,
        default_model: impl Into<String>,
    ) -> Self {
        Self { pipelines, providers, default_model: default_model.into() }
    }
}

#[async_trait]
impl PipelineStage for PipelineResolutionStage {
    fn name(&self) -> &str {
        "pipeline_resolution"
    }

    async fn execute(&self, mut ctx: SearchContext) -> StageOutcome {
        match self.pipelines.default_for_user(ctx.user_id).await {
            Ok(Some(pipeline)) => {
                ctx.pipeline_id = Some(pipeline.id);
                ctx.record_stage(
                    self.name(),
                    serde_json::json!({ "pipeline_id": pipeline.id, "created": false }),
                );
                StageOutcome::Continue(ctx)
            }
            Ok(None) => self.create_default_pipeline(ctx).await,
            Err(err) => StageOutcome::Abort(err),
        }
    }
}

impl PipelineResolutionStage {
    async fn create_default_pipeline(&self, mut ctx: SearchContext) -> StageOutcome {
        let provider = match self.providers.preferred_for_user(ctx.user_id).await {
            Ok(Some(provider)) => provider,
            Ok(None) => {
                return StageOutcome::Abort(Error::NotFound(format!(
                    "no LLM provider configured for user {}",
                    ctx.user_id
                )));
            }
            Err(err) => return StageOutcome::Abort(err),
        };

        let pipeline = Pipeline {
            id: Uuid::new_v4(),
            user_id: ctx.user_id,
            provider_id: provider.id,
            model: self.default_model.clone(),
            parameters: LlmParameters::default(),
            rag_template: default_rag_template(),
            question_generation_template: default_question_generation_template(),
            is_default: true,
        };

        if let Err(err) = self.pipelines.upsert(&pipeline).await {
            return StageOutcome::Abort(err);
        }

        ctx.pipeline_id = Some(pipeline.id);
        ctx.record_stage(self.name(), serde_json::json!({ "pipeline_id": pipeline.id, "created": true }));
        StageOutcome::Continue(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragcore_core::ProviderConfig;
    use std::sync::Mutex;

    struct EmptyPipelines(Mutex<Option<Pipeline>>);

    #[async_trait]
    impl PipelineRepository for EmptyPipelines {
        async fn default_for_user(&self, _user_id: Uuid) -> ragcore_core::Result<Option<Pipeline>> {
            Ok(self.0.lock().unwrap().clone())
        }
        async fn get(&self, _user_id: Uuid, _pipeline_id: Uuid) -> ragcore_core::Result<Option<Pipeline>> {
            Ok(self.0.lock().unwrap().clone())
        }
        async fn upsert(&self, pipeline: &Pipeline) -> ragcore_core::Result<()> {
            *self.0.lock().unwrap() = Some(pipeline.clone());
            Ok(())
        }
    }

    struct NoProvider;

    #[async_trait]
    impl ProviderRepository for NoProvider {
        async fn preferred_for_user(&self, _user_id: Uuid) -> ragcore_core::Result<Option<ProviderConfig>> {
            Ok(None)
        }
    }

    struct OneProvider(Uuid);

    #[async_trait]
    impl ProviderRepository for OneProvider {
        async fn preferred_for_user(&self, _user_id: Uuid) -> ragcore_core::Result<Option<ProviderConfig>> {
            Ok(Some(ProviderConfig {
                id: self.0,
                user_id: Uuid::new_v4(),
                kind: ragcore_core::ProviderKind::LocalStub,
                api_key: None,
                endpoint: String::new(),
                is_default: true,
            }))
        }
    }

    fn ctx() -> SearchContext {
        SearchContext::new("r1".into(), "q".into(), Uuid::new_v4(), Uuid::new_v4())
    }

    #[tokio::test]
    async fn aborts_when_no_pipeline_and_no_provider() {
        let stage = PipelineResolutionStage::new(
            Arc::new(EmptyPipelines(Mutex::new(None))),
            Arc::new(NoProvider),
            "local-stub",
        );
        match stage.execute(ctx()).await {
            StageOutcome::Abort(Error::NotFound(_)) => {}
            _ => panic!("expected NotFound abort"),
        }
    }

    #[tokio::test]
    async fn creates_and_persists_a_default_pipeline() {
        let provider_id = Uuid::new_v4();
        let pipelines = Arc::new(EmptyPipelines(Mutex::new(None)));
        let stage = PipelineResolutionStage::new(pipelines.clone(), Arc::new(OneProvider(provider_id)), "local-stub");

        match stage.execute(ctx()).await {
            StageOutcome::Continue(ctx) => {
                assert!(ctx.pipeline_id.is_some());
                assert_eq!(ctx.stage_metadata["pipeline_resolution"]["created"], true);
            }
            StageOutcome::Abort(e) => panic!("unexpected abort: {e}"),
        }
        assert!(pipelines.0.lock().unwrap().is_some());
    }
}
