//! Optional secondary scoring stage applied after fusion. A reranker must
//! preserve the input chunk set (spec §4.2 Reranking invariant: it reorders
//! and rescales, never drops or adds).

use ragcore_core::QueryResult;

/// Cheap lexical-overlap scorer used when no reranker model is configured.
/// Grounded in the teacher's `SimpleScorer` fallback path.
pub struct LexicalOverlapReranker;

impl LexicalOverlapReranker {
    pub fn score(query: &str, text: &str) -> f32 {
        let query_terms: std::collections::HashSet<String> =
            query.to_lowercase().split_whitespace().map(String::from).collect();
        if query_terms.is_empty() {
            return 0.0;
        }
        let text_terms: std::collections::HashSet<String> =
            text.to_lowercase().split_whitespace().map(String::from).collect();
        let overlap = query_terms.intersection(&text_terms).count();
        overlap as f32 / query_terms.len() as f32
    }

    /// Reorders `results` by blending their existing fused score with a
    /// lexical-overlap score against `query`. Count is preserved exactly.
    pub fn rerank(query: &str, mut results: Vec<QueryResult>) -> Vec<QueryResult> {
        let mut scored: Vec<(QueryResult, f32)> = results
            .drain(..)
            .map(|r| {
                let overlap = Self::score(query, &r.chunk.text);
                (r, overlap)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .map(|(mut r, overlap)| {
                r.score = r.score * 0.5 + overlap * 0.5;
                r
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::Chunk;

    fn qr(id: &str, text: &str, score: f32) -> QueryResult {
        QueryResult {
            chunk: Chunk {
                chunk_id: id.to_string(),
                document_id: "d1".to_string(),
                document_title: None,
                text: text.to_string(),
                page: None,
                ordinal: 0,
                embedding: Vec::new(),
            },
            score,
        }
    }

    #[test]
    fn rerank_preserves_count() {
        let results = vec![qr("a", "gold loan rate", 0.4), qr("b", "unrelated content", 0.6)];
        let reranked = LexicalOverlapReranker::rerank("gold loan", results);
        assert_eq!(reranked.len(), 2);
    }

    #[test]
    fn rerank_favors_lexical_overlap() {
        let results = vec![qr("a", "totally unrelated text", 0.9), qr("b", "gold loan interest", 0.1)];
        let reranked = LexicalOverlapReranker::rerank("gold loan interest", results);
        assert_eq!(reranked[0].chunk.chunk_id, "b");
    }
}
