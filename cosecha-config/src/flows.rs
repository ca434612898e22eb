//! Per-flow model pinning.
//!
//! Flows may pin a model profile (and optionally a temperature); flows
//! without a pin use the profile named by `default_model`.

use serde::Deserialize;

/// Root configuration for flow bindings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowsConfig {
    /// Model profile used by flows without a pin.
    #[serde(default)]
    pub default_model: Option<String>,
    /// Per-flow pins.
    #[serde(default)]
    pub pins: Vec<FlowPin>,
}

impl FlowsConfig {
    /// Get the pin for a flow, if any.
    pub fn pin_for(&self, flow: &str) -> Option<&FlowPin> {
        self.pins.iter().find(|p| p.flow == flow)
    }

    /// List pinned flow names.
    pub fn pinned_flows(&self) -> Vec<&str> {
        self.pins.iter().map(|p| p.flow.as_str()).collect()
    }
}

/// One flow-to-model binding.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowPin {
    /// Flow name.
    pub flow: String,
    /// Model profile name.
    pub model: String,
    /// Optional temperature override, clamped by the profile's guardrails.
    #[serde(default)]
    pub temperature: Option<f32>,
}
