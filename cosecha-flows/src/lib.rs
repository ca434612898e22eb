//! # Cosecha Flows
//!
//! The five production inference flows of the farm-operations app:
//! - [`production`]: validate reported harvest batches (judgment)
//! - [`packaging`]: validate packaging shift reports (judgment)
//! - [`weather`]: generate weather-risk alerts (generative)
//! - [`plant`]: diagnose a plant from a photo and description (generative)
//! - [`report`]: summarize agronomist field reports (generative)
//!
//! Each module declares its input/output schemas, prompt template, and
//! fallback policy, and exposes one typed async entry point. `build_registry`
//! wires all five into a [`FlowRegistry`] at startup; the registry is
//! read-only from then on.

use thiserror::Error;

use cosecha_config::CosechaConfig;
use cosecha_core::composer::TemplateError;
use cosecha_core::flow::{FlowDefinition, FlowRegistry, RegistryError};

pub mod packaging;
pub mod plant;
pub mod production;
pub mod report;
pub mod weather;

pub use packaging::{validate_packaging_data, PackagingShift, PackagingValidation};
pub use plant::{diagnose_plant, DiagnosisCandidate, PlantDiagnosis, PlantSample};
pub use production::{validate_production_data, ProductionBatch, ProductionValidation};
pub use report::{summarize_agronomist_report, ReportSummary};
pub use weather::{generate_weather_alerts, Urgency, WeatherAlert};

/// Registry construction errors.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("template error in flow '{flow}': {source}")]
    Template {
        flow: &'static str,
        #[source]
        source: TemplateError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

fn definitions() -> Result<Vec<FlowDefinition>, BootstrapError> {
    Ok(vec![
        production::definition()?,
        packaging::definition()?,
        weather::definition()?,
        plant::definition()?,
        report::definition()?,
    ])
}

/// Build the registry with no model pins; every flow uses the process-wide
/// default model.
pub fn build_registry() -> Result<FlowRegistry, BootstrapError> {
    let mut registry = FlowRegistry::new();
    for flow in definitions()? {
        registry.register(flow)?;
    }
    Ok(registry)
}

/// Build the registry, pinning models per flow from configuration.
pub fn build_registry_with(config: &CosechaConfig) -> Result<FlowRegistry, BootstrapError> {
    let mut registry = FlowRegistry::new();
    for mut flow in definitions()? {
        if let Some(resolved) = config.resolve_model(flow.name) {
            flow.model = Some(resolved.model);
            if let Some(temperature) = resolved.temperature {
                flow.temperature = Some(temperature);
            }
        }
        registry.register(flow)?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_holds_all_five_flows() {
        let registry = build_registry().unwrap();
        assert_eq!(
            registry.names(),
            vec![
                plant::FLOW_NAME,
                weather::FLOW_NAME,
                report::FLOW_NAME,
                packaging::FLOW_NAME,
                production::FLOW_NAME,
            ]
        );
    }

    #[test]
    fn test_config_pins_apply() {
        let yaml = r#"
providers:
  backends:
    - name: gemini
      kind: gemini
      api_key_env: GEMINI_API_KEY
  models:
    - name: fast
      backend: gemini
      model: gemini-2.0-flash
      temperature: 0.2
    - name: vision
      backend: gemini
      model: gemini-2.0-pro
      temperature: 0.4
flows:
  default_model: fast
  pins:
    - flow: diagnose_plant
      model: vision
"#;
        let config: CosechaConfig = serde_yaml::from_str(yaml).unwrap();
        let registry = build_registry_with(&config).unwrap();

        let pinned = registry.get(plant::FLOW_NAME).unwrap();
        assert_eq!(pinned.model.as_deref(), Some("gemini-2.0-pro"));
        assert_eq!(pinned.temperature, Some(0.4));

        let defaulted = registry.get(production::FLOW_NAME).unwrap();
        assert_eq!(defaulted.model.as_deref(), Some("gemini-2.0-flash"));
    }
}
