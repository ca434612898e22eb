//! Reasoner construction from backend configuration.

use std::sync::Arc;

use thiserror::Error;

use cosecha_config::{ApiKeyError, BackendSpec};
use cosecha_core::reasoner::Reasoner;

use crate::gemini::{GeminiReasoner, GeminiReasonerConfig};
use crate::http::{HttpReasoner, HttpReasonerConfig};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur when building a reasoner.
#[derive(Debug, Error)]
pub enum ReasonerBuildError {
    #[error("unknown backend kind: {0}")]
    UnknownKind(String),
    #[error("missing API key for backend '{0}'")]
    MissingApiKey(String),
    #[error("environment variable '{0}' not found")]
    EnvNotFound(String),
    #[error("client init failed: {0}")]
    Init(String),
}

/// Build a reasoner from a backend spec.
pub fn build_reasoner(backend: &BackendSpec) -> Result<Arc<dyn Reasoner>, ReasonerBuildError> {
    let timeout_secs = backend
        .get_config::<u64>("timeout_secs")
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    match backend.kind.to_lowercase().as_str() {
        "gemini" | "google" => {
            let api_key = resolve_api_key(backend)?;
            let mut config = GeminiReasonerConfig {
                api_key,
                timeout_secs,
                ..Default::default()
            };
            if let Some(endpoint) = &backend.endpoint {
                config.endpoint = endpoint.clone();
            }
            let client =
                GeminiReasoner::new(config).map_err(|e| ReasonerBuildError::Init(e.to_string()))?;
            Ok(Arc::new(client))
        }
        "openai" | "openai-compatible" => {
            let api_key = resolve_api_key(backend)?;
            let mut config = HttpReasonerConfig {
                api_key: Some(api_key),
                timeout_secs,
                ..Default::default()
            };
            if let Some(endpoint) = &backend.endpoint {
                config.endpoint = endpoint.clone();
            }
            let client =
                HttpReasoner::new(config).map_err(|e| ReasonerBuildError::Init(e.to_string()))?;
            Ok(Arc::new(client))
        }
        kind => Err(ReasonerBuildError::UnknownKind(kind.to_string())),
    }
}

fn resolve_api_key(backend: &BackendSpec) -> Result<String, ReasonerBuildError> {
    backend.resolve_api_key().map_err(|err| match err {
        ApiKeyError::NotConfigured => ReasonerBuildError::MissingApiKey(backend.name.clone()),
        ApiKeyError::EnvNotFound(name) => ReasonerBuildError::EnvNotFound(name),
    })
}
