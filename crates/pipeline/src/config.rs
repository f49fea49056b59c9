//! Per-request pipeline configuration (spec §6 `config_metadata`). Defaults
//! mirror `ragcore-retrieval`'s `RetrieverConfig` and `ragcore-validation`'s
//! retry defaults so an empty request body behaves sanely.

use std::time::Duration;

use ragcore_core::StructuredFormat;

pub const MIN_MAX_CITATIONS: usize = 1;
pub const MAX_MAX_CITATIONS: usize = 20;
const DEFAULT_MAX_CITATIONS: usize = 5;

#[derive(Debug, Clone)]
pub struct PipelineRunConfig {
    pub structured_output_enabled: bool,
    pub format_type: StructuredFormat,
    pub include_reasoning: bool,
    pub max_citations: usize,
    pub min_confidence: f32,
    pub validation_strict: bool,
    pub max_context_per_doc: usize,
    pub reranking_enabled: bool,
    pub response_agent_deadline: Duration,
    pub validation_max_retries: u32,
    pub cot_requested: bool,
}

impl Default for PipelineRunConfig {
    fn default() -> Self {
        Self {
            structured_output_enabled: true,
            format_type: StructuredFormat::Standard,
            include_reasoning: false,
            max_citations: DEFAULT_MAX_CITATIONS,
            min_confidence: 0.0,
            validation_strict: false,
            max_context_per_doc: 3,
            reranking_enabled: true,
            response_agent_deadline: Duration::from_secs(8),
            validation_max_retries: 1,
            cot_requested: false,
        }
    }
}

impl PipelineRunConfig {
    /// Clamps `max_citations` into `[MIN_MAX_CITATIONS, MAX_MAX_CITATIONS]`
    /// (spec §6), so a caller-supplied value of `0` or `1000` can't blow up
    /// citation attribution or the response payload.
    pub fn with_max_citations(mut self, max_citations: usize) -> Self {
        self.max_citations = max_citations.clamp(MIN_MAX_CITATIONS, MAX_MAX_CITATIONS);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_citations_clamps_to_bounds() {
        assert_eq!(PipelineRunConfig::default().with_max_citations(0).max_citations, MIN_MAX_CITATIONS);
        assert_eq!(PipelineRunConfig::default().with_max_citations(1000).max_citations, MAX_MAX_CITATIONS);
        assert_eq!(PipelineRunConfig::default().with_max_citations(7).max_citations, 7);
    }
}
