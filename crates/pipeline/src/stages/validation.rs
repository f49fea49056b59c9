//! Validation (spec §4.1 stage 8): re-validates the generated structured
//! answer and, in strict mode, retries generation through a caller-supplied
//! regenerate closure when validation fails outright. Skipped entirely if
//! Generation didn't produce a structured answer (nothing to validate).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use ragcore_core::{Chunk, Error, SearchContext, StructuredAnswer};
use ragcore_validation::{CitationAttributionService, validate_answer, validate_with_retry};

use crate::stage::{PipelineStage, StageOutcome};

type Regenerate = Arc<dyn Fn(u32) -> Pin<Box<dyn Future<Output = StructuredAnswer> + Send>> + Send + Sync>;

pub struct ValidationStage {
    attribution: Arc<CitationAttributionService>,
    max_retries: u32,
    /// Set only in strict mode; re-runs generation when the first attempt
    /// fails validation. `None` means "validate and record issues, but keep
    /// the original answer" (spec §4.1 Validation is optional-on-failure).
    regenerate: Option<Regenerate>,
    /// Spec §6 `config_metadata.validation_strict`: when true, an answer that
    /// still has validation issues (or falls below `min_confidence`) after
    /// any retry aborts the request instead of being returned as-is.
    strict: bool,
    min_confidence: f32,
}

impl ValidationStage {
    pub fn new(attribution: Arc<CitationAttributionService>, max_retries: u32) -> Self {
        Self { attribution, max_retries, regenerate: None, strict: false, min_confidence: 0.0 }
    }

    pub fn with_regenerate(mut self, regenerate: Regenerate) -> Self {
        self.regenerate = Some(regenerate);
        self
    }

    pub fn with_strict(mut self, strict: bool, min_confidence: f32) -> Self {
        self.strict = strict;
        self.min_confidence = min_confidence;
        self
    }
}

#[async_trait]
impl PipelineStage for ValidationStage {
    fn name(&self) -> &str {
        "validation"
    }

    async fn execute(&self, mut ctx: SearchContext) -> StageOutcome {
        let Some(answer) = ctx.structured_answer.clone() else {
            return StageOutcome::Continue(ctx);
        };

        let chunks: Vec<Chunk> = ctx.effective_results().iter().map(|r| r.chunk.clone()).collect();

        let (final_answer, report) = match &self.regenerate {
            Some(regenerate) => {
                let regenerate = regenerate.clone();
                let first = answer.clone();
                validate_with_retry(&chunks, &self.attribution, self.max_retries, move |attempt| {
                    let regenerate = regenerate.clone();
                    let first = first.clone();
                    async move { if attempt == 0 { first } else { regenerate(attempt).await } }
                })
                .await
            }
            None => {
                let report = validate_answer(&answer, &chunks, &self.attribution);
                (answer, report)
            }
        };

        ctx.record_stage(
            self.name(),
            serde_json::json!({
                "quality_score": report.quality_score,
                "issue_count": report.issues.len(),
                "valid": report.is_valid(),
                "confidence": final_answer.confidence,
            }),
        );

        let below_confidence = final_answer.confidence < self.min_confidence;
        if self.strict && (!report.is_valid() || below_confidence) {
            let mut messages: Vec<String> = report.issues.iter().map(|i| format!("{}: {}", i.field, i.message)).collect();
            if below_confidence {
                messages.push(format!("confidence {:.2} below required {:.2}", final_answer.confidence, self.min_confidence));
            }
            return StageOutcome::Abort(Error::ValidationFailed(messages));
        }

        ctx.answer_text = Some(final_answer.answer.clone());
        ctx.structured_answer = Some(final_answer);
        StageOutcome::Continue(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::StructuredFormat;
    use uuid::Uuid;

    fn chunk(document_id: &str, text: &str) -> Chunk {
        Chunk {
            chunk_id: format!("{document_id}-c0"),
            document_id: document_id.to_string(),
            document_title: Some("Doc".to_string()),
            text: text.to_string(),
            page: None,
            ordinal: 0,
            embedding: Vec::new(),
        }
    }

    #[tokio::test]
    async fn skipped_when_no_structured_answer_present() {
        let stage = ValidationStage::new(Arc::new(CitationAttributionService::new(None)), 1);
        let ctx = SearchContext::new("r1".into(), "q".into(), Uuid::new_v4(), Uuid::new_v4());
        match stage.execute(ctx).await {
            StageOutcome::Continue(ctx) => assert!(ctx.structured_answer.is_none()),
            StageOutcome::Abort(e) => panic!("unexpected abort: {e}"),
        }
    }

    #[tokio::test]
    async fn records_validation_outcome_without_regenerate() {
        let stage = ValidationStage::new(Arc::new(CitationAttributionService::new(None)), 1);
        let mut ctx = SearchContext::new("r1".into(), "q".into(), Uuid::new_v4(), Uuid::new_v4());
        ctx.query_results = vec![ragcore_core::QueryResult { chunk: chunk("d1", "rate is ten percent"), score: 0.5 }];
        ctx.structured_answer = Some(StructuredAnswer {
            answer: "The rate is ten percent.".to_string(),
            citations: Vec::new(),
            confidence: 0.8,
            reasoning_steps: Vec::new(),
            format: StructuredFormat::Standard,
        });

        match stage.execute(ctx).await {
            StageOutcome::Continue(ctx) => assert!(ctx.stage_metadata.contains_key("validation")),
            StageOutcome::Abort(e) => panic!("unexpected abort: {e}"),
        }
    }
}
