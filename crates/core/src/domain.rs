//! Domain model: collections, chunks, pipelines, prompt templates, providers.
//!
//! Grounded in spec §3. `Collection`/`Chunk` are accepted as given inputs to
//! retrieval (document ingestion and chunking policy are out of scope).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An addressable corpus. Queryable only when `status == Ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub vector_index_name: String,
    pub status: CollectionStatus,
    pub is_private: bool,
    /// Bumped whenever the underlying chunk set changes; drives keyword
    /// index invalidation (spec §4.2 step 3).
    pub generation: u64,
}

impl Collection {
    pub fn is_ready(&self) -> bool {
        matches!(self.status, CollectionStatus::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Created,
    Processing,
    Ready,
    Failed,
}

/// A text span with metadata, the unit retrieval operates over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub document_id: String,
    /// Populated from `Document` at ingestion time; used for `Citation.title`.
    pub document_title: Option<String>,
    pub text: String,
    pub page: Option<u32>,
    pub ordinal: u32,
    pub embedding: Vec<f32>,
}

/// Per-user pipeline configuration binding provider, model, LLM parameters,
/// and the two prompt templates used at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_id: Uuid,
    pub model: String,
    pub parameters: LlmParameters,
    pub rag_template: PromptTemplate,
    pub question_generation_template: PromptTemplate,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmParameters {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_k: u32,
    pub top_p: f32,
    pub repetition_penalty: f32,
}

impl Default for LlmParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            top_k: 50,
            top_p: 0.9,
            repetition_penalty: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    /// Template string with `{context}` / `{question}` / `{history}` placeholders.
    pub template: String,
}

impl PromptTemplate {
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = self.template.clone();
        for (key, value) in vars {
            out = out.replace(&format!("{{{key}}}"), value);
        }
        out
    }
}

/// A user's registered LLM provider account, used when resolving a default
/// pipeline (spec §4.1 PipelineResolution).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    LocalStub,
    Http,
    Vendor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_template_placeholders() {
        let tpl = PromptTemplate {
            name: "rag".into(),
            template: "Context:\n{context}\n\nQuestion: {question}".into(),
        };
        let rendered = tpl.render(&[("context", "Paris is in France."), ("question", "Where is Paris?")]);
        assert!(rendered.contains("Paris is in France."));
        assert!(rendered.contains("Where is Paris?"));
    }

    #[test]
    fn collection_ready_gate() {
        let mut c = Collection {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            vector_index_name: "idx".into(),
            status: CollectionStatus::Processing,
            is_private: false,
            generation: 0,
        };
        assert!(!c.is_ready());
        c.status = CollectionStatus::Ready;
        assert!(c.is_ready());
    }
}
