//! # Cosecha Config
//!
//! Configuration for the cosecha pipeline: reasoner backends, model
//! profiles, and per-flow model pinning. Loaded once at bootstrap from a
//! single YAML file and read-only thereafter.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

mod flows;
mod providers;

pub use flows::{FlowPin, FlowsConfig};
pub use providers::{ApiKeyError, BackendSpec, ModelPolicy, ModelProfile, ProvidersConfig};

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Unified configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct CosechaConfig {
    /// Config schema version; must be > 0.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Reasoner backends and model profiles.
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Flow-to-model bindings.
    #[serde(default)]
    pub flows: FlowsConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for CosechaConfig {
    fn default() -> Self {
        Self {
            version: 1,
            providers: ProvidersConfig::default(),
            flows: FlowsConfig::default(),
        }
    }
}

/// A flow's model binding after profile resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    /// Actual model name the backend understands.
    pub model: String,
    /// Temperature after guardrail clamping, if any was configured.
    pub temperature: Option<f32>,
}

impl CosechaConfig {
    /// Resolve the model binding for a flow: its pin, else the default
    /// profile. Returns `None` when neither names a known profile.
    pub fn resolve_model(&self, flow: &str) -> Option<ResolvedModel> {
        let pin = self.flows.pin_for(flow);
        let profile_name = pin
            .map(|p| p.model.as_str())
            .or(self.flows.default_model.as_deref())?;
        let profile = self.providers.get_model(profile_name)?;
        let temperature = pin
            .and_then(|p| p.temperature)
            .or(profile.temperature)
            .map(|t| profile.clamp_temperature(t));
        Some(ResolvedModel {
            model: profile.model.clone(),
            temperature,
        })
    }
}

/// Load full configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<CosechaConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: CosechaConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &CosechaConfig) -> Result<(), ConfigError> {
    if config.version == 0 {
        return Err(ConfigError::Invalid(
            "version must be greater than 0".to_string(),
        ));
    }

    for backend in &config.providers.backends {
        if backend.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "providers.backends[].name must not be empty".to_string(),
            ));
        }
        if backend.kind.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "providers.backends[].kind must not be empty".to_string(),
            ));
        }
    }

    for model in &config.providers.models {
        if model.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "providers.models[].name must not be empty".to_string(),
            ));
        }
        if model.model.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "providers.models[{}].model must not be empty",
                model.name
            )));
        }
        if let Some(backend) = &model.backend {
            if config.providers.get_backend(backend).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "providers.models[{}].backend '{}' not found",
                    model.name, backend
                )));
            }
        }
    }

    if let Some(default_backend) = &config.providers.default_backend {
        if config.providers.get_backend(default_backend).is_none() {
            return Err(ConfigError::Invalid(format!(
                "providers.default_backend '{}' not found",
                default_backend
            )));
        }
    }

    if let Some(default_model) = &config.providers.default_model {
        if config.providers.get_model(default_model).is_none() {
            return Err(ConfigError::Invalid(format!(
                "providers.default_model '{}' not found",
                default_model
            )));
        }
    }

    if let Some(default_model) = &config.flows.default_model {
        if config.providers.get_model(default_model).is_none() {
            return Err(ConfigError::Invalid(format!(
                "flows.default_model '{}' not found",
                default_model
            )));
        }
    }

    for pin in &config.flows.pins {
        if pin.flow.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "flows.pins[].flow must not be empty".to_string(),
            ));
        }
        if config.providers.get_model(&pin.model).is_none() {
            return Err(ConfigError::Invalid(format!(
                "flows.pins[{}].model '{}' not found",
                pin.flow, pin.model
            )));
        }
    }

    Ok(())
}
