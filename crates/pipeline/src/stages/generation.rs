//! Generation (spec §4.1 stage 7): renders the resolved pipeline's RAG
//! template over the retrieved context and calls the LLM, optionally
//! decomposing the question first via chain-of-thought (spec §4.4).
//!
//! Chain-of-thought here answers every sub-question against the single
//! context retrieved once upstream, rather than re-running retrieval per
//! sub-question — keeping the nine stages a fixed linear sequence instead of
//! a nested loop. Citation attribution always runs and a `StructuredAnswer`
//! is always populated; `structured_output_enabled` only controls what the
//! HTTP/WS layer exposes from it (see `ragcore-server`).

use std::sync::Arc;

use async_trait::async_trait;
use ragcore_core::{
    Chunk, Citation, Error, Pipeline, PipelineRepository, PromptTemplate, QueryResult,
    ReasoningStep, SearchContext, StructuredAnswer, StructuredFormat,
    traits::{GenerationParams, LlmProvider},
};
use ragcore_cot::ChainOfThoughtEngine;
use ragcore_validation::CitationAttributionService;

use crate::config::PipelineRunConfig;
use crate::stage::{PipelineStage, StageOutcome};

pub struct GenerationStage {
    llm: Arc<dyn LlmProvider>,
    pipelines: Arc<dyn PipelineRepository>,
    attribution: Arc<CitationAttributionService>,
    cot: Arc<ChainOfThoughtEngine>,
    config: PipelineRunConfig,
}

impl GenerationStage {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        pipelines: Arc<dyn PipelineRepository>,
        attribution: Arc<CitationAttributionService>,
        cot: Arc<ChainOfThoughtEngine>,
        config: PipelineRunConfig,
    ) -> Self {
        Self { llm, pipelines, attribution, cot, config }
    }

    async fn answer_once(&self, template: &PromptTemplate, question: &str, context: &str) -> Result<String, Error> {
        let prompt = template.render(&[("context", context), ("question", question)]);
        let (text, _usage) = self.llm.generate(&prompt, &GenerationParams::default()).await?;
        Ok(text)
    }

    async fn run_cot(
        &self,
        pipeline: &Pipeline,
        question: &str,
        context: &str,
    ) -> Result<(String, Vec<ReasoningStep>, StructuredFormat), Error> {
        let sub_questions = self.cot.decompose(question).await.map_err(|e| Error::Provider(e.to_string()))?;

        let mut steps = Vec::with_capacity(sub_questions.len());
        for (idx, sub_question) in sub_questions.iter().enumerate() {
            let sub_answer = self.answer_once(&pipeline.rag_template, sub_question, context).await?;
            steps.push(ReasoningStep { number: idx as u32 + 1, thought: sub_question.clone(), conclusion: sub_answer });
        }

        let synthesis_context = steps
            .iter()
            .map(|s| format!("{}. {} -> {}", s.number, s.thought, s.conclusion))
            .collect::<Vec<_>>()
            .join("\n");
        let final_answer = self.answer_once(&pipeline.rag_template, question, &synthesis_context).await?;

        Ok((final_answer, steps, StructuredFormat::CotReasoning))
    }
}

#[async_trait]
impl PipelineStage for GenerationStage {
    fn name(&self) -> &str {
        "generation"
    }

    async fn execute(&self, mut ctx: SearchContext) -> StageOutcome {
        let Some(pipeline_id) = ctx.pipeline_id else {
            return StageOutcome::Abort(Error::Internal(
                "generation stage reached without a resolved pipeline".to_string(),
            ));
        };

        let pipeline = match self.pipelines.get(ctx.user_id, pipeline_id).await {
            Ok(Some(pipeline)) => pipeline,
            Ok(None) => return StageOutcome::Abort(Error::NotFound(format!("pipeline {pipeline_id} not found"))),
            Err(err) => return StageOutcome::Abort(err),
        };

        let question = ctx.rewritten_query.clone().unwrap_or_else(|| ctx.question.clone());
        let chunks: Vec<Chunk> = ctx.effective_results().iter().map(|r| r.chunk.clone()).collect();
        let context = build_context(ctx.effective_results(), self.config.max_context_per_doc);

        let cot_engaged = ctx
            .stage_metadata
            .get("query_enhancement")
            .and_then(|v| v.get("cot_engaged"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let (answer_text, reasoning_steps, format) = if cot_engaged {
            match self.run_cot(&pipeline, &question, &context).await {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(error = %err, "chain-of-thought decomposition failed, falling back to direct generation");
                    match self.answer_once(&pipeline.rag_template, &question, &context).await {
                        Ok(text) => (text, Vec::new(), StructuredFormat::Standard),
                        Err(err) => return StageOutcome::Abort(err),
                    }
                }
            }
        } else {
            match self.answer_once(&pipeline.rag_template, &question, &context).await {
                Ok(text) => (text, Vec::new(), StructuredFormat::Standard),
                Err(err) => return StageOutcome::Abort(err),
            }
        };

        let citations = match self.attribution.attribute_citations(&answer_text, &chunks, self.config.max_citations).await {
            Ok(citations) => citations,
            Err(err) => {
                tracing::warn!(error = %err, "citation attribution failed, returning answer without citations");
                Vec::new()
            }
        };

        let structured = StructuredAnswer {
            confidence: estimate_confidence(&citations),
            answer: answer_text.clone(),
            citations,
            reasoning_steps,
            format,
        }
        .dedupe_citations();

        ctx.record_stage(
            self.name(),
            serde_json::json!({ "cot_engaged": cot_engaged, "citation_count": structured.citations.len() }),
        );
        ctx.answer_text = Some(answer_text);
        ctx.structured_answer = Some(structured);
        StageOutcome::Continue(ctx)
    }
}

fn build_context(results: &[QueryResult], max_per_doc: usize) -> String {
    use std::collections::HashMap;

    let mut per_doc: HashMap<&str, usize> = HashMap::new();
    let mut parts = Vec::new();

    for result in results {
        let doc_id = result.chunk.document_id.as_str();
        let count = per_doc.entry(doc_id).or_insert(0);
        if *count >= max_per_doc {
            continue;
        }
        *count += 1;
        let title = result.chunk.document_title.as_deref().unwrap_or(doc_id);
        parts.push(format!("[{title}] {}", result.chunk.text));
    }

    parts.join("\n\n")
}

fn estimate_confidence(citations: &[Citation]) -> f32 {
    if citations.is_empty() {
        return 0.3;
    }
    let avg = citations.iter().map(|c| c.relevance_score).sum::<f32>() / citations.len() as f32;
    avg.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qr(document_id: &str, title: &str, text: &str) -> QueryResult {
        QueryResult {
            chunk: Chunk {
                chunk_id: format!("{document_id}-c0"),
                document_id: document_id.to_string(),
                document_title: Some(title.to_string()),
                text: text.to_string(),
                page: None,
                ordinal: 0,
                embedding: Vec::new(),
            },
            score: 0.5,
        }
    }

    #[test]
    fn build_context_caps_chunks_per_document() {
        let results = vec![
            qr("d1", "Doc 1", "chunk a"),
            qr("d1", "Doc 1", "chunk b"),
            qr("d1", "Doc 1", "chunk c"),
            qr("d2", "Doc 2", "chunk d"),
        ];
        let context = build_context(&results, 2);
        assert_eq!(context.matches("Doc 1").count(), 2);
        assert_eq!(context.matches("Doc 2").count(), 1);
    }

    #[test]
    fn confidence_defaults_low_without_citations() {
        assert_eq!(estimate_confidence(&[]), 0.3);
    }
}
