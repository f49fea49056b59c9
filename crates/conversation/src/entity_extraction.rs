//! Named-entity carrying across turns (spec §4.5.1). `fast` uses a regex
//! heuristic in place of a statistical NER model (no such model exists in
//! this stack); `llm` delegates to the configured provider; `hybrid` runs
//! both and refines with the LLM once the context is long enough to be
//! worth the extra call.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use ragcore_core::{GenerationParams, LlmProvider};
use regex::Regex;

const DEFAULT_MAX_ENTITIES: usize = 10;
const HYBRID_REFINEMENT_WORD_THRESHOLD: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Fast,
    Llm,
    Hybrid,
}

static CAPITALIZED_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z][\w&]*(?:\s+[A-Z][\w&]*)*)\b").unwrap());
static MONEY_OR_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$?\b\d[\d,]*(?:\.\d+)?%?\b").unwrap());

pub struct EntityExtractor {
    llm: Option<Arc<dyn LlmProvider>>,
    cache: Mutex<HashMap<String, Vec<String>>>,
}

impl EntityExtractor {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { llm, cache: Mutex::new(HashMap::new()) }
    }

    pub async fn extract(&self, context: &str, method: ExtractionMethod, max_entities: usize) -> Vec<String> {
        let trimmed = context.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let max_entities = if max_entities == 0 { DEFAULT_MAX_ENTITIES } else { max_entities };
        let cache_key = format!("{:?}:{:x}", method, fnv1a(trimmed));

        if let Some(cached) = self.cache.lock().get(&cache_key) {
            return cached.clone();
        }

        let raw = match method {
            ExtractionMethod::Fast => extract_with_regex(trimmed),
            ExtractionMethod::Llm => self.extract_with_llm(trimmed).await,
            ExtractionMethod::Hybrid => self.extract_hybrid(trimmed).await,
        };

        let entities = dedupe_case_insensitive(raw, max_entities);
        self.cache.lock().insert(cache_key, entities.clone());
        entities
    }

    async fn extract_with_llm(&self, context: &str) -> Vec<String> {
        let Some(llm) = &self.llm else {
            return extract_with_regex(context);
        };

        let prompt = format!(
            "Extract 5-10 key entities from this conversation context.\n\n\
             Focus on organizations, people, products, dates, and technical or financial terms.\n\
             Ignore pronouns and generic discourse words.\n\
             Return ONLY a comma-separated list of entities. No explanations.\n\n\
             Context: {}\n\nEntities:",
            truncate_at_char_boundary(context, 500)
        );

        let params = GenerationParams { max_tokens: 100, temperature: 0.0, ..GenerationParams::default() };
        match llm.generate(&prompt, &params).await {
            Ok((text, _usage)) => text.split(',').map(|e| e.trim().to_string()).filter(|e| !e.is_empty()).collect(),
            Err(err) => {
                tracing::warn!(error = %err, "llm entity extraction failed, falling back to regex");
                extract_with_regex(context)
            }
        }
    }

    async fn extract_hybrid(&self, context: &str) -> Vec<String> {
        let fast_entities = extract_with_regex(context);
        let word_count = context.split_whitespace().count();

        if word_count <= HYBRID_REFINEMENT_WORD_THRESHOLD || self.llm.is_none() {
            return fast_entities;
        }

        let llm_entities = self.extract_with_llm(context).await;
        let mut combined: Vec<String> = fast_entities.iter().cloned().collect();
        for e in &llm_entities {
            if !combined.iter().any(|existing| existing.eq_ignore_ascii_case(e)) {
                combined.push(e.clone());
            }
        }

        combined.sort_by_key(|e| {
            let in_both = fast_entities.iter().any(|f| f.eq_ignore_ascii_case(e)) && llm_entities.iter().any(|l| l.eq_ignore_ascii_case(e));
            let in_llm = llm_entities.iter().any(|l| l.eq_ignore_ascii_case(e));
            std::cmp::Reverse((in_both, in_llm, e.split_whitespace().count()))
        });
        combined
    }
}

/// Truncates at a char boundary at or before `max_bytes`, so multi-byte UTF-8
/// text doesn't panic the prompt formatting.
fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn extract_with_regex(context: &str) -> Vec<String> {
    let mut entities = Vec::new();
    for capture in CAPITALIZED_RUN.find_iter(context) {
        entities.push(capture.as_str().to_string());
    }
    for capture in MONEY_OR_NUMBER.find_iter(context) {
        entities.push(capture.as_str().to_string());
    }
    entities
}

fn dedupe_case_insensitive(entities: Vec<String>, max_entities: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for entity in entities {
        let cleaned = entity.trim().to_string();
        if cleaned.is_empty() {
            continue;
        }
        let key = cleaned.to_lowercase();
        if seen.insert(key) {
            out.push(cleaned);
            if out.len() >= max_entities {
                break;
            }
        }
    }
    out
}

fn fnv1a(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in text.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fast_extraction_finds_proper_nouns_and_numbers() {
        let extractor = EntityExtractor::new(None);
        let entities = extractor.extract("IBM reported revenue of $73.6B in 2020", ExtractionMethod::Fast, 10).await;

        assert!(entities.iter().any(|e| e == "IBM"));
        assert!(entities.iter().any(|e| e.contains("73.6")));
    }

    #[tokio::test]
    async fn results_are_deduplicated_case_insensitively_and_capped() {
        let extractor = EntityExtractor::new(None);
        let entities = extractor
            .extract("Apple apple APPLE Microsoft Google Amazon Meta Netflix Tesla Intel AMD Nvidia", ExtractionMethod::Fast, 3)
            .await;
        assert_eq!(entities.len(), 3);
    }

    #[tokio::test]
    async fn empty_context_returns_no_entities() {
        let extractor = EntityExtractor::new(None);
        assert!(extractor.extract("   ", ExtractionMethod::Fast, 10).await.is_empty());
    }

    #[tokio::test]
    async fn llm_method_without_provider_falls_back_to_regex() {
        let extractor = EntityExtractor::new(None);
        let entities = extractor.extract("OpenAI released GPT-4 in 2023", ExtractionMethod::Llm, 10).await;
        assert!(entities.iter().any(|e| e == "OpenAI" || e.contains("GPT")));
    }

    #[tokio::test]
    async fn repeated_calls_hit_the_cache() {
        let extractor = EntityExtractor::new(None);
        let first = extractor.extract("Tesla delivered record units", ExtractionMethod::Fast, 10).await;
        let second = extractor.extract("Tesla delivered record units", ExtractionMethod::Fast, 10).await;
        assert_eq!(first, second);
    }
}
