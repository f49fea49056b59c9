//! Post-hoc citation attribution: attaches citations to an answer when the
//! LLM's own citation list fails validation, or fills gaps in a partially
//! supported answer.
//!
//! Tries semantic similarity first (cosine over sentence/chunk embeddings,
//! threshold 0.75), falling back to lexical (Jaccard) overlap at 0.3 when no
//! embedder is configured or the semantic pass finds nothing.

use std::collections::HashMap;
use std::sync::Arc;

use ragcore_core::{Chunk, Citation, traits::EmbeddingProvider};

use crate::error::ValidationError;

const SEMANTIC_SIMILARITY_THRESHOLD: f32 = 0.75;
const LEXICAL_OVERLAP_THRESHOLD: f32 = 0.3;
const MIN_EXCERPT_LEN: usize = 20;
const MAX_EXCERPT_LEN: usize = 500;

pub struct CitationAttributionService {
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    similarity_threshold: f32,
    lexical_threshold: f32,
}

impl CitationAttributionService {
    pub fn new(embedder: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self {
            embedder,
            similarity_threshold: SEMANTIC_SIMILARITY_THRESHOLD,
            lexical_threshold: LEXICAL_OVERLAP_THRESHOLD,
        }
    }

    pub fn with_thresholds(mut self, similarity: f32, lexical: f32) -> Self {
        self.similarity_threshold = similarity;
        self.lexical_threshold = lexical;
        self
    }

    pub async fn attribute_citations(
        &self,
        answer: &str,
        chunks: &[Chunk],
        max_citations: usize,
    ) -> Result<Vec<Citation>, ValidationError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(embedder) = &self.embedder {
            match self.semantic_similarity_attribution(answer, chunks, max_citations, embedder.as_ref()).await {
                Ok(citations) if !citations.is_empty() => return Ok(citations),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "semantic attribution failed, falling back to lexical overlap");
                }
            }
        }

        Ok(self.lexical_overlap_attribution(answer, chunks, max_citations))
    }

    async fn semantic_similarity_attribution(
        &self,
        answer: &str,
        chunks: &[Chunk],
        max_citations: usize,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<Citation>, ValidationError> {
        let sentences = split_into_sentences(answer);
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let sentence_embeddings = embedder
            .embed(&sentences)
            .await
            .map_err(|_| ValidationError::DimensionMismatch(0, 0))?;
        let chunk_texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let chunk_embeddings = embedder
            .embed(&chunk_texts)
            .await
            .map_err(|_| ValidationError::DimensionMismatch(0, 0))?;

        let mut scores: HashMap<usize, f32> = HashMap::new();
        for sentence_embedding in &sentence_embeddings {
            for (chunk_idx, chunk_embedding) in chunk_embeddings.iter().enumerate() {
                let similarity = cosine_similarity(sentence_embedding, chunk_embedding)?;
                if similarity >= self.similarity_threshold {
                    scores
                        .entry(chunk_idx)
                        .and_modify(|s| *s = s.max(similarity))
                        .or_insert(similarity);
                }
            }
        }

        Ok(self.create_citations_from_scores(scores, chunks, answer, max_citations))
    }

    fn lexical_overlap_attribution(&self, answer: &str, chunks: &[Chunk], max_citations: usize) -> Vec<Citation> {
        let answer_words: std::collections::HashSet<String> = tokenize(&answer.to_lowercase());

        let mut scores: HashMap<usize, f32> = HashMap::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let chunk_words = tokenize(&chunk.text.to_lowercase());
            if chunk_words.is_empty() {
                continue;
            }
            let overlap = answer_words.intersection(&chunk_words).count();
            let union = answer_words.union(&chunk_words).count();
            let score = if union > 0 { overlap as f32 / union as f32 } else { 0.0 };
            if score >= self.lexical_threshold {
                scores.insert(idx, score);
            }
        }

        self.create_citations_from_scores(scores, chunks, answer, max_citations)
    }

    fn create_citations_from_scores(
        &self,
        scores: HashMap<usize, f32>,
        chunks: &[Chunk],
        answer: &str,
        max_citations: usize,
    ) -> Vec<Citation> {
        let mut indices: Vec<usize> = scores.keys().copied().collect();
        indices.sort_by(|a, b| scores[b].partial_cmp(&scores[a]).unwrap_or(std::cmp::Ordering::Equal));
        indices.truncate(max_citations);

        indices
            .into_iter()
            .map(|idx| {
                let chunk = &chunks[idx];
                let score = scores[&idx];
                Citation {
                    document_id: chunk.document_id.clone(),
                    title: chunk.document_title.clone().unwrap_or_else(|| "Untitled".to_string()),
                    excerpt: extract_excerpt(&chunk.text, answer),
                    page: chunk.page,
                    relevance_score: (score * 1000.0).round() / 1000.0,
                    chunk_id: Some(chunk.chunk_id.clone()),
                }
            })
            .collect()
    }

    /// Checks whether a citation's excerpt actually appears (verbatim or by
    /// word overlap) in the chunk it claims to cite.
    pub fn validate_citation_support(&self, citation: &Citation, chunks: &[Chunk], min_overlap: f32) -> bool {
        let Some(chunk) = chunks.iter().find(|c| c.document_id == citation.document_id) else {
            return false;
        };

        let content = chunk.text.to_lowercase();
        let excerpt = citation.excerpt.to_lowercase();

        if content.contains(&excerpt) {
            return true;
        }

        let excerpt_words = tokenize(&excerpt);
        if excerpt_words.is_empty() {
            return false;
        }
        let content_words = tokenize(&content);
        let overlap = excerpt_words.intersection(&content_words).count();
        (overlap as f32 / excerpt_words.len() as f32) >= min_overlap
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, ValidationError> {
    if a.len() != b.len() {
        return Err(ValidationError::DimensionMismatch(a.len(), b.len()));
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (mag_a * mag_b))
}

fn split_into_sentences(text: &str) -> Vec<String> {
    text.split(|c| c == '.' || c == '!' || c == '?')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn tokenize(text: &str) -> std::collections::HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

fn extract_excerpt(content: &str, answer: &str) -> String {
    let answer_words = tokenize(&answer.to_lowercase());
    let content_sentences = split_into_sentences(content);

    let mut best_sentence = "";
    let mut best_overlap = 0usize;
    for sentence in &content_sentences {
        let sentence_words = tokenize(&sentence.to_lowercase());
        let overlap = answer_words.intersection(&sentence_words).count();
        if overlap > best_overlap {
            best_overlap = overlap;
            best_sentence = sentence;
        }
    }

    let mut excerpt = if !best_sentence.is_empty() && best_sentence.len() >= MIN_EXCERPT_LEN {
        best_sentence.to_string()
    } else {
        content.to_string()
    };

    if excerpt.len() > MAX_EXCERPT_LEN {
        excerpt.truncate(MAX_EXCERPT_LEN);
        excerpt.push_str("...");
    }

    if excerpt.len() < MIN_EXCERPT_LEN {
        excerpt = if content.len() > MAX_EXCERPT_LEN { content[..MAX_EXCERPT_LEN].to_string() } else { content.to_string() };
    }

    excerpt.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, document_id: &str, text: &str) -> Chunk {
        Chunk {
            chunk_id: id.to_string(),
            document_id: document_id.to_string(),
            document_title: Some("Doc".to_string()),
            text: text.to_string(),
            page: None,
            ordinal: 0,
            embedding: Vec::new(),
        }
    }

    #[tokio::test]
    async fn lexical_fallback_attributes_overlapping_chunk() {
        let service = CitationAttributionService::new(None);
        let chunks = vec![
            chunk("c1", "d1", "Gold loan interest rate is ten percent per annum"),
            chunk("c2", "d2", "Completely unrelated weather forecast discussion"),
        ];
        let citations = service
            .attribute_citations("The gold loan interest rate is ten percent", &chunks, 5)
            .await
            .unwrap();
        assert!(!citations.is_empty());
        assert_eq!(citations[0].document_id, "d1");
    }

    #[test]
    fn validate_citation_support_accepts_verbatim_excerpt() {
        let service = CitationAttributionService::new(None);
        let chunks = vec![chunk("c1", "d1", "The gold loan interest rate is ten percent per annum")];
        let citation = Citation {
            document_id: "d1".to_string(),
            title: "Doc".to_string(),
            excerpt: "interest rate is ten percent".to_string(),
            page: None,
            relevance_score: 0.9,
            chunk_id: Some("c1".to_string()),
        };
        assert!(service.validate_citation_support(&citation, &chunks, 0.3));
    }

    #[test]
    fn validate_citation_support_rejects_unrelated_excerpt() {
        let service = CitationAttributionService::new(None);
        let chunks = vec![chunk("c1", "d1", "The gold loan interest rate is ten percent per annum")];
        let citation = Citation {
            document_id: "d1".to_string(),
            title: "Doc".to_string(),
            excerpt: "completely different unrelated sentence about weather".to_string(),
            page: None,
            relevance_score: 0.9,
            chunk_id: Some("c1".to_string()),
        };
        assert!(!service.validate_citation_support(&citation, &chunks, 0.3));
    }
}
