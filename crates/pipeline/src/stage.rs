//! The stage contract every pipeline step implements (spec §4.1). A stage
//! either hands back a mutated `SearchContext` to continue, or aborts the
//! whole request with an error. Optional stages (anything the spec marks
//! as best-effort) are wrapped in `Optional` so a failure downgrades to
//! `Continue` with the pre-stage context, instead of failing the request.

use async_trait::async_trait;
use ragcore_core::{Error, SearchContext};

pub enum StageOutcome {
    Continue(SearchContext),
    Abort(Error),
}

#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, ctx: SearchContext) -> StageOutcome;
}

/// Downgrades an inner stage's `Abort` to `Continue`, logging a warning and
/// leaving the context exactly as it was before the stage ran.
pub struct Optional<S>(pub S);

#[async_trait]
impl<S: PipelineStage> PipelineStage for Optional<S> {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn execute(&self, ctx: SearchContext) -> StageOutcome {
        let name = self.0.name().to_string();
        let fallback = ctx.clone();
        match self.0.execute(ctx).await {
            StageOutcome::Continue(ctx) => StageOutcome::Continue(ctx),
            StageOutcome::Abort(err) => {
                tracing::warn!(stage = %name, error = %err, "optional stage failed, continuing");
                StageOutcome::Continue(fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    struct AlwaysAborts;

    #[async_trait]
    impl PipelineStage for AlwaysAborts {
        fn name(&self) -> &str {
            "always_aborts"
        }
        async fn execute(&self, _ctx: SearchContext) -> StageOutcome {
            StageOutcome::Abort(Error::Internal("boom".into()))
        }
    }

    #[tokio::test]
    async fn optional_wrapper_downgrades_abort_to_continue() {
        let ctx = SearchContext::new("r1".into(), "q".into(), Uuid::new_v4(), Uuid::new_v4());
        let stage = Optional(AlwaysAborts);
        match stage.execute(ctx).await {
            StageOutcome::Continue(_) => {}
            StageOutcome::Abort(_) => panic!("optional stage must not abort"),
        }
    }
}
