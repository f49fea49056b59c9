//! Structured-answer validation: confidence bounds, citation-reference
//! integrity, and a retry loop that asks the generation stage for another
//! attempt when validation fails outright.

use std::future::Future;

use ragcore_core::{Chunk, StructuredAnswer};

use crate::attribution::CitationAttributionService;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// Dotted path into the structured answer, e.g. `"citations[2].document_id"`.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub quality_score: f32,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validates a `StructuredAnswer` against the chunks it was generated from.
/// Checks performed:
/// - `confidence` is within `[0.0, 1.0]`
/// - `answer` text is non-empty
/// - every citation's `document_id` matches a chunk that was actually
///   retrieved (an LLM can't cite a document it was never shown)
/// - every citation's excerpt is actually supported by its cited chunk
pub fn validate_answer(
    answer: &StructuredAnswer,
    chunks: &[Chunk],
    attribution: &CitationAttributionService,
) -> ValidationReport {
    let mut issues = Vec::new();

    if !(0.0..=1.0).contains(&answer.confidence) {
        issues.push(ValidationIssue::new("confidence", format!("{} is outside [0.0, 1.0]", answer.confidence)));
    }

    if answer.answer.trim().is_empty() {
        issues.push(ValidationIssue::new("answer", "answer text is empty"));
    }

    for (idx, citation) in answer.citations.iter().enumerate() {
        let matching_chunk = chunks.iter().find(|c| c.document_id == citation.document_id);
        match matching_chunk {
            None => {
                issues.push(ValidationIssue::new(
                    format!("citations[{idx}].document_id"),
                    format!("references document {} which was not retrieved", citation.document_id),
                ));
            }
            Some(_) => {
                if !attribution.validate_citation_support(citation, chunks, 0.3) {
                    issues.push(ValidationIssue::new(
                        format!("citations[{idx}].excerpt"),
                        "excerpt is not supported by the cited chunk",
                    ));
                }
            }
        }
    }

    ValidationReport { quality_score: answer.quality_score(), issues }
}

/// Calls `generate` up to `max_retries + 1` times, validating each attempt,
/// and returns the first valid answer it sees, or the last attempt along
/// with its issues if none validate. A stage that always fails validation
/// still produces a usable (if flagged) answer rather than aborting the
/// pipeline, per the optional-on-failure semantics of post-search stages.
pub async fn validate_with_retry<F, Fut>(
    chunks: &[Chunk],
    attribution: &CitationAttributionService,
    max_retries: u32,
    mut generate: F,
) -> (StructuredAnswer, ValidationReport)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = StructuredAnswer>,
{
    let mut last: Option<(StructuredAnswer, ValidationReport)> = None;

    for attempt in 0..=max_retries {
        let answer = generate(attempt).await;
        let report = validate_answer(&answer, chunks, attribution);
        let valid = report.is_valid();
        last = Some((answer, report));
        if valid {
            break;
        }
    }

    last.expect("loop runs at least once since max_retries + 1 >= 1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::{Citation, StructuredFormat};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

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

    fn valid_answer(chunks: &[Chunk]) -> StructuredAnswer {
        StructuredAnswer {
            answer: "The rate is ten percent.".to_string(),
            citations: vec![Citation {
                document_id: chunks[0].document_id.clone(),
                title: "Doc".to_string(),
                excerpt: chunks[0].text.clone(),
                page: None,
                relevance_score: 0.9,
                chunk_id: Some(chunks[0].chunk_id.clone()),
            }],
            confidence: 0.8,
            reasoning_steps: Vec::new(),
            format: StructuredFormat::Standard,
        }
    }

    #[test]
    fn rejects_confidence_out_of_range() {
        let chunks = vec![chunk("d1", "rate is ten percent")];
        let mut answer = valid_answer(&chunks);
        answer.confidence = 1.5;
        let attribution = CitationAttributionService::new(None);
        let report = validate_answer(&answer, &chunks, &attribution);
        assert!(!report.is_valid());
    }

    #[test]
    fn rejects_citation_to_unretrieved_document() {
        let chunks = vec![chunk("d1", "rate is ten percent")];
        let mut answer = valid_answer(&chunks);
        answer.citations[0].document_id = "d999".to_string();
        let attribution = CitationAttributionService::new(None);
        let report = validate_answer(&answer, &chunks, &attribution);
        assert!(report.issues.iter().any(|i| i.field.contains("document_id")));
    }

    #[tokio::test]
    async fn retry_stops_once_an_attempt_validates() {
        let chunks = vec![chunk("d1", "the rate is ten percent")];
        let attribution = CitationAttributionService::new(None);
        let call_count = Arc::new(AtomicU32::new(0));

        let counted = Arc::clone(&call_count);
        let chunks_for_closure = chunks.clone();
        let (answer, report) = validate_with_retry(&chunks, &attribution, 3, move |attempt| {
            counted.fetch_add(1, Ordering::SeqCst);
            let chunks = chunks_for_closure.clone();
            async move {
                if attempt == 0 {
                    StructuredAnswer {
                        answer: "".to_string(),
                        citations: Vec::new(),
                        confidence: 0.5,
                        reasoning_steps: Vec::new(),
                        format: StructuredFormat::Standard,
                    }
                } else {
                    valid_answer(&chunks)
                }
            }
        })
        .await;

        assert!(report.is_valid());
        assert!(!answer.answer.is_empty());
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }
}
