//! Reasoner backend and model configuration types.

use serde::Deserialize;
use serde_json::Value;

/// Root configuration for reasoner providers.
///
/// - `backends`: vendor/endpoint/auth config
/// - `models`: model presets + optional guardrails
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    /// Default backend name.
    #[serde(default)]
    pub default_backend: Option<String>,
    /// Default model profile name.
    #[serde(default)]
    pub default_model: Option<String>,
    /// Backend definitions.
    #[serde(default)]
    pub backends: Vec<BackendSpec>,
    /// Model profiles.
    #[serde(default)]
    pub models: Vec<ModelProfile>,
}

impl ProvidersConfig {
    /// Get backend by name.
    pub fn get_backend(&self, name: &str) -> Option<&BackendSpec> {
        self.backends.iter().find(|b| b.name == name)
    }

    /// Get model profile by name.
    pub fn get_model(&self, name: &str) -> Option<&ModelProfile> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Get the default backend, falling back to the first declared.
    pub fn get_default_backend(&self) -> Option<&BackendSpec> {
        if let Some(name) = &self.default_backend {
            return self.get_backend(name);
        }
        self.backends.first()
    }

    /// Get the default model profile, falling back to the first declared.
    pub fn get_default_model(&self) -> Option<&ModelProfile> {
        if let Some(name) = &self.default_model {
            return self.get_model(name);
        }
        self.models.first()
    }

    /// List all backend names.
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name.as_str()).collect()
    }

    /// List all model profile names.
    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }
}

/// Backend configuration (auth, endpoint, vendor).
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSpec {
    /// Backend identifier (e.g. "gemini", "openai").
    pub name: String,
    /// Backend kind understood by the reasoner factory.
    pub kind: String,
    /// Optional custom endpoint URL.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Environment variable name containing the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Backend-specific settings.
    #[serde(default)]
    pub config: Value,
}

impl BackendSpec {
    /// Resolve the API key from environment variable.
    pub fn resolve_api_key(&self) -> Result<String, ApiKeyError> {
        let env_name = self.api_key_env.as_ref().ok_or(ApiKeyError::NotConfigured)?;
        std::env::var(env_name).map_err(|_| ApiKeyError::EnvNotFound(env_name.clone()))
    }

    /// Read backend config value as typed object.
    pub fn get_config<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Model profile used when binding a flow to a model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelProfile {
    /// Profile name (e.g. "fast", "vision", "cheap").
    pub name: String,
    /// Backend reference.
    #[serde(default)]
    pub backend: Option<String>,
    /// Actual model name.
    pub model: String,
    /// Optional default temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Optional guardrails.
    #[serde(default)]
    pub policy: ModelPolicy,
}

impl ModelProfile {
    /// Clamp input temperature with configured guardrails.
    pub fn clamp_temperature(&self, candidate: f32) -> f32 {
        let mut value = candidate;
        if let Some(min) = self.policy.temperature_min {
            value = value.max(min);
        }
        if let Some(max) = self.policy.temperature_max {
            value = value.min(max);
        }
        value
    }
}

/// Optional model guardrails.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelPolicy {
    #[serde(default)]
    pub temperature_min: Option<f32>,
    #[serde(default)]
    pub temperature_max: Option<f32>,
}

/// Errors related to API key resolution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiKeyError {
    #[error("API key environment variable not configured")]
    NotConfigured,
    #[error("Environment variable '{0}' not found")]
    EnvNotFound(String),
}
