//! Structured answer and citation types (spec §3, §4.3).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredFormat {
    Standard,
    CotReasoning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub number: u32,
    pub thought: String,
    pub conclusion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: String,
    pub title: String,
    pub excerpt: String,
    pub page: Option<u32>,
    pub relevance_score: f32,
    pub chunk_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredAnswer {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub confidence: f32,
    pub reasoning_steps: Vec<ReasoningStep>,
    pub format: StructuredFormat,
}

impl StructuredAnswer {
    /// Merge citations that share `(document_id, chunk_id, page)`, keeping
    /// the highest relevance score (spec §3 Citation invariant).
    pub fn dedupe_citations(mut self) -> Self {
        self.citations = dedupe_citations(self.citations);
        self
    }

    /// Weighted quality score for reporting (spec §4.3), not used for gating.
    pub fn quality_score(&self) -> f32 {
        let confidence_component = self.confidence.clamp(0.0, 1.0) * 0.4;
        let citation_component = (self.citations.len().min(3) as f32 / 3.0) * 0.3;
        let completeness_component = (self.answer.chars().count().min(200) as f32 / 200.0) * 0.2;
        let reasoning_component = if self.reasoning_steps.is_empty() { 0.0 } else { 0.1 };
        confidence_component + citation_component + completeness_component + reasoning_component
    }
}

pub fn dedupe_citations(citations: Vec<Citation>) -> Vec<Citation> {
    use std::collections::HashMap;
    let mut best: HashMap<(String, Option<String>, Option<u32>), Citation> = HashMap::new();
    for citation in citations {
        let key = (citation.document_id.clone(), citation.chunk_id.clone(), citation.page);
        match best.get(&key) {
            Some(existing) if existing.relevance_score >= citation.relevance_score => {}
            _ => {
                best.insert(key, citation);
            }
        }
    }
    let mut out: Vec<Citation> = best.into_values().collect();
    out.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap());
    out
}

/// Document-id stub used only for test fixtures; real callers key the
/// collection's `Uuid`-typed documents, but retrieved chunk metadata keeps
/// ids as opaque strings since ingestion is out of scope.
pub fn is_valid_document_ref(id: &str) -> bool {
    !id.is_empty() || Uuid::parse_str(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(doc: &str, chunk: &str, page: u32, score: f32) -> Citation {
        Citation {
            document_id: doc.into(),
            title: "t".into(),
            excerpt: "excerpt text long enough".into(),
            page: Some(page),
            relevance_score: score,
            chunk_id: Some(chunk.into()),
        }
    }

    #[test]
    fn dedupe_keeps_highest_score() {
        let citations = vec![citation("d1", "c1", 1, 0.5), citation("d1", "c1", 1, 0.9)];
        let deduped = dedupe_citations(citations);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].relevance_score, 0.9);
    }

    #[test]
    fn quality_score_in_unit_interval() {
        let answer = StructuredAnswer {
            answer: "a".repeat(300),
            citations: vec![citation("d1", "c1", 1, 0.9), citation("d2", "c2", 2, 0.8)],
            confidence: 0.95,
            reasoning_steps: vec![],
            format: StructuredFormat::Standard,
        };
        let score = answer.quality_score();
        assert!(score > 0.0 && score <= 1.0);
    }
}
