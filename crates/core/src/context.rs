//! `SearchContext`: the mutable record threaded through pipeline stages
//! (spec §3, §4.1).

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::Chunk;
use crate::structured::StructuredAnswer;

/// `{chunk, score}` pair; higher score is better after normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRunStatus {
    Success,
    Failed,
    Timeout,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunResult {
    pub agent_name: String,
    pub status: AgentRunStatus,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentExecutionSummary {
    pub runs: Vec<AgentRunResult>,
}

impl AgentExecutionSummary {
    pub fn record(&mut self, result: AgentRunResult) {
        self.runs.push(result);
    }

    pub fn total_time_ms(&self) -> u64 {
        self.runs.iter().map(|r| r.execution_time_ms).sum()
    }

    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|r| matches!(r.status, AgentRunStatus::Success)).count()
    }

    pub fn failed(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| matches!(r.status, AgentRunStatus::Failed | AgentRunStatus::Timeout))
            .count()
    }
}

/// The context threaded through `PipelineResolution → ... → ResponseAgents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchContext {
    pub request_id: String,
    pub question: String,
    pub user_id: Uuid,
    pub collection_id: Uuid,
    pub pipeline_id: Option<Uuid>,
    pub rewritten_query: Option<String>,
    pub query_results: Vec<QueryResult>,
    pub reranked_results: Vec<QueryResult>,
    pub structured_answer: Option<StructuredAnswer>,
    pub answer_text: Option<String>,
    pub document_metadata: HashMap<String, Value>,
    pub artifacts: HashMap<String, Value>,
    pub agent_summary: AgentExecutionSummary,
    /// Append-only metadata keyed by stage name.
    pub stage_metadata: HashMap<String, Value>,
}

impl SearchContext {
    pub fn new(request_id: String, question: String, user_id: Uuid, collection_id: Uuid) -> Self {
        Self {
            request_id,
            question,
            user_id,
            collection_id,
            pipeline_id: None,
            rewritten_query: None,
            query_results: Vec::new(),
            reranked_results: Vec::new(),
            structured_answer: None,
            answer_text: None,
            document_metadata: HashMap::new(),
            artifacts: HashMap::new(),
            agent_summary: AgentExecutionSummary::default(),
            stage_metadata: HashMap::new(),
        }
    }

    /// Record metadata for a stage, never overwriting a previous stage's
    /// entry (append-only per spec §3).
    pub fn record_stage(&mut self, stage: &str, value: Value) {
        self.stage_metadata.entry(stage.to_string()).or_insert(value);
    }

    /// The results Generation should consume: reranked if present, else raw.
    pub fn effective_results(&self) -> &[QueryResult] {
        if self.reranked_results.is_empty() {
            &self.query_results
        } else {
            &self.reranked_results
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_stage_is_append_only() {
        let mut ctx = SearchContext::new("r1".into(), "q".into(), Uuid::new_v4(), Uuid::new_v4());
        ctx.record_stage("retrieval", Value::from(1));
        ctx.record_stage("retrieval", Value::from(2));
        assert_eq!(ctx.stage_metadata["retrieval"], Value::from(1));
    }

    #[test]
    fn effective_results_prefers_reranked() {
        let mut ctx = SearchContext::new("r1".into(), "q".into(), Uuid::new_v4(), Uuid::new_v4());
        assert!(ctx.effective_results().is_empty());
        ctx.query_results.push(QueryResult {
            chunk: crate::domain::Chunk {
                chunk_id: "c1".into(),
                document_id: "d1".into(),
                document_title: None,
                text: "t".into(),
                page: None,
                ordinal: 0,
                embedding: vec![],
            },
            score: 0.5,
        });
        assert_eq!(ctx.effective_results().len(), 1);
    }
}
