//! Embedding provider selection, kept separate from `factory::create_provider`
//! since a pipeline's embedding model and its generation model are
//! independently configurable (spec §4.2: `embedding_model` lives on
//! `RetrievalConfig`, not on the LLM provider).

use std::sync::Arc;

use ragcore_core::{Result, traits::EmbeddingProvider};

use crate::http_backend::{HttpBackend, HttpBackendConfig};
use crate::local_stub::LocalStubProvider;

#[derive(Debug, Clone)]
pub enum EmbeddingBackendConfig {
    LocalStub { dimension: usize },
    Http { base_url: String, model: String },
}

/// Resolves the configured embedding backend. `"local-stub"` (the config
/// default, spec §4.2) always resolves to `LocalStub` regardless of what
/// the caller passes for dimension/model, so a misconfigured deployment
/// degrades to the offline embedder instead of failing at startup.
pub fn create_embedding_provider(config: &EmbeddingBackendConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config {
        EmbeddingBackendConfig::LocalStub { dimension } => {
            Ok(Arc::new(LocalStubProvider::new(*dimension)))
        }
        EmbeddingBackendConfig::Http { base_url, model } => {
            let backend_config = HttpBackendConfig::new(base_url.clone(), model.clone());
            Ok(Arc::new(HttpBackend::new(backend_config)?))
        }
    }
}

pub fn resolve_embedding_backend(model_name: &str, endpoint: &str, dimension: usize) -> EmbeddingBackendConfig {
    if model_name == "local-stub" || endpoint.is_empty() {
        EmbeddingBackendConfig::LocalStub { dimension }
    } else {
        EmbeddingBackendConfig::Http {
            base_url: endpoint.to_string(),
            model: model_name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_stub_model_name_resolves_to_local_stub() {
        let config = resolve_embedding_backend("local-stub", "http://localhost:6334", 384);
        assert!(matches!(config, EmbeddingBackendConfig::LocalStub { .. }));
    }

    #[test]
    fn named_model_with_endpoint_resolves_to_http() {
        let config = resolve_embedding_backend("nomic-embed-text", "http://localhost:11434", 768);
        assert!(matches!(config, EmbeddingBackendConfig::Http { .. }));
    }
}
