//! Flow definitions, fallback policy, and the registry.
//!
//! A flow is one named, schema-bound inference capability. The registry maps
//! flow names to definitions; it is populated during bootstrap and shared
//! immutably (behind `Arc`) for the process lifetime.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::composer::PromptTemplate;
use crate::schema::Schema;

/// What replaces a missing or invalid reasoner candidate.
///
/// Structured judgments degrade to a permissive default so an inference
/// failure never blocks the caller's workflow; free-form generative content
/// has no safe default and degrades to an explicit failure instead.
#[derive(Debug, Clone)]
pub enum FallbackPolicy {
    /// Return this value in place of the candidate.
    Default(Value),
    /// Surface a hard failure to the caller.
    Fail,
}

/// One named inference capability: schemas, template, model, fallback.
///
/// Immutable after registration.
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    /// Globally unique flow name.
    pub name: &'static str,
    /// Shape the caller's merged request document must satisfy.
    pub input_schema: Schema,
    /// Shape a candidate must satisfy to be accepted.
    pub output_schema: Schema,
    /// Prompt template interpolated per request.
    pub template: PromptTemplate,
    /// Pinned model, or `None` to use the process-wide default.
    pub model: Option<String>,
    /// Pinned temperature, or `None` to use the process-wide default.
    pub temperature: Option<f32>,
    /// What happens when no valid candidate is produced.
    pub fallback: FallbackPolicy,
}

impl FlowDefinition {
    /// Create a definition with no model pin.
    pub fn new(
        name: &'static str,
        input_schema: Schema,
        output_schema: Schema,
        template: PromptTemplate,
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            name,
            input_schema,
            output_schema,
            template,
            model: None,
            temperature: None,
            fallback,
        }
    }

    /// Pin a model for this flow.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Pin a sampling temperature for this flow.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("flow '{0}' is already registered")]
    DuplicateFlow(String),
}

/// Startup-populated mapping from flow name to definition.
///
/// Mutable only while being built; afterwards it is read-only shared state.
/// Looking up a name that was never registered is a programming error in the
/// caller, not a user-facing condition.
#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: HashMap<&'static str, FlowDefinition>,
}

impl FlowRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flow; names must be unique.
    pub fn register(&mut self, flow: FlowDefinition) -> Result<(), RegistryError> {
        if self.flows.contains_key(flow.name) {
            return Err(RegistryError::DuplicateFlow(flow.name.to_string()));
        }
        self.flows.insert(flow.name, flow);
        Ok(())
    }

    /// Look up a flow by name.
    pub fn get(&self, name: &str) -> Option<&FlowDefinition> {
        self.flows.get(name)
    }

    /// Registered flow names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.flows.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered flows.
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
