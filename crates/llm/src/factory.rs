//! Builds an `LlmProvider` from a `ragcore_core::ProviderConfig`. Grounded
//! in the teacher's `LlmFactory`: a small enum-dispatched constructor, no
//! dynamic plugin loading.

use std::sync::Arc;

use ragcore_core::{Error, ProviderKind, Result, traits::LlmProvider};

use crate::http_backend::{HttpBackend, HttpBackendConfig};
use crate::local_stub::LocalStubProvider;
use crate::vendor::{VendorBackend, VendorConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    LocalStub,
    Http,
    Vendor,
}

impl From<ProviderKind> for LlmProviderKind {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::LocalStub => LlmProviderKind::LocalStub,
            ProviderKind::Http => LlmProviderKind::Http,
            ProviderKind::Vendor => LlmProviderKind::Vendor,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmProviderConfig {
    pub kind: LlmProviderKind,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl LlmProviderConfig {
    pub fn local_stub() -> Self {
        Self {
            kind: LlmProviderKind::LocalStub,
            endpoint: String::new(),
            api_key: None,
            model: "local-stub".to_string(),
        }
    }
}

/// Constructs the provider for this config. Only `Vendor` requires an
/// `api_key`; a missing key for that kind is a configuration error rather
/// than a silent fallback, since a vendor pipeline without credentials would
/// fail on first real request anyway.
pub fn create_provider(config: &LlmProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.kind {
        LlmProviderKind::LocalStub => Ok(Arc::new(LocalStubProvider::default())),
        LlmProviderKind::Http => {
            let backend_config = HttpBackendConfig::new(config.endpoint.clone(), config.model.clone());
            let backend = HttpBackend::new(backend_config)?;
            Ok(Arc::new(backend))
        }
        LlmProviderKind::Vendor => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| Error::Validation("vendor provider requires an api_key".to_string()))?;
            let mut vendor_config = VendorConfig::new(api_key, config.model.clone());
            if !config.endpoint.is_empty() {
                vendor_config.base_url = config.endpoint.clone();
            }
            let backend = VendorBackend::new(vendor_config)?;
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_stub_config_builds_without_error() {
        let config = LlmProviderConfig::local_stub();
        assert!(create_provider(&config).is_ok());
    }

    #[test]
    fn vendor_without_api_key_is_rejected() {
        let config = LlmProviderConfig {
            kind: LlmProviderKind::Vendor,
            endpoint: String::new(),
            api_key: None,
            model: "claude-3-5-sonnet".to_string(),
        };
        assert!(create_provider(&config).is_err());
    }
}
