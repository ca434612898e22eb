//! End-to-end flow execution.
//!
//! One run is: validate input → compose → invoke → accept → fallback.
//! Each run owns its request and response data exclusively; concurrent runs
//! share nothing but the read-only registry and the reasoner handle. There
//! is exactly one external call per logical request and no cancellation
//! propagation — a late result is simply dropped by the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::composer::{response_instructions, ComposeError, PromptPart};
use crate::flow::{FallbackPolicy, FlowDefinition, FlowRegistry};
use crate::reasoner::{GenerateRequest, Reasoner, ReasonerError, ReasoningCandidate};
use crate::schema::{Schema, SchemaViolations};

const MAX_CANDIDATE_LOG_CHARS: usize = 8_000;

/// Opaque prior records supplied for comparison, keyed by field name.
///
/// Read-only to the pipeline: entries are interpolated into the request and
/// never mutated or persisted. Kept ordered so composition stays
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct HistoricalContext {
    entries: BTreeMap<String, String>,
}

impl HistoricalContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a serialized collection under a field name.
    pub fn with(mut self, key: impl Into<String>, blob: impl Into<String>) -> Self {
        self.entries.insert(key.into(), blob.into());
        self
    }

    /// Iterate entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, blob)| (key.as_str(), blob.as_str()))
    }

    /// Whether any entries were supplied.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One invocation of a flow. Created per call, used once, never mutated.
#[derive(Debug, Clone)]
pub struct FlowRequest {
    /// Correlates log lines of a single run.
    pub request_id: Uuid,
    /// Name of the flow to run.
    pub flow: String,
    /// Typed input payload, serialized to a JSON object.
    pub payload: Value,
    /// Historical comparison data.
    pub context: HistoricalContext,
}

impl FlowRequest {
    /// Create a request with an empty historical context.
    pub fn new(flow: impl Into<String>, payload: Value) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            flow: flow.into(),
            payload,
            context: HistoricalContext::new(),
        }
    }

    /// Attach historical context.
    pub fn with_context(mut self, context: HistoricalContext) -> Self {
        self.context = context;
        self
    }
}

/// Flow execution errors
///
/// The three classes propagate differently: input errors are local and final
/// (never retried); invocation errors are recoverable by retrying the whole
/// request at the caller's discretion; output errors are absorbed by a
/// `Default` fallback and only surface for flows that declare `Fail`.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("unknown flow '{0}'")]
    UnknownFlow(String),

    #[error("input rejected: {0}")]
    Input(#[from] SchemaViolations),

    #[error("request composition failed: {0}")]
    Compose(#[from] ComposeError),

    #[error("reasoning call failed: {0}")]
    Invocation(#[from] ReasonerError),

    #[error("flow '{0}' produced no schema-valid result")]
    Output(String),

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Process-wide model defaults, used by flows without a pin.
#[derive(Debug, Clone)]
pub struct PipelineDefaults {
    pub model: String,
    pub temperature: f32,
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.2,
        }
    }
}

/// The assembled pipeline: registry, reasoner, defaults.
///
/// All collaborators are passed in explicitly, so every component is
/// testable without a live reasoning service.
pub struct Pipeline<R: Reasoner> {
    registry: Arc<FlowRegistry>,
    reasoner: R,
    defaults: PipelineDefaults,
}

impl<R: Reasoner> Pipeline<R> {
    /// Assemble a pipeline over a populated registry.
    pub fn new(registry: Arc<FlowRegistry>, reasoner: R) -> Self {
        Self {
            registry,
            reasoner,
            defaults: PipelineDefaults::default(),
        }
    }

    /// Override the process-wide model defaults.
    pub fn with_defaults(mut self, defaults: PipelineDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// The registry this pipeline dispatches against.
    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    /// Run one request to a typed JSON result.
    ///
    /// The returned value always satisfies the flow's output schema; when no
    /// candidate did, it equals the flow's declared fallback value.
    pub async fn run(&self, request: FlowRequest) -> Result<Value, FlowError> {
        let flow = self
            .registry
            .get(&request.flow)
            .ok_or_else(|| FlowError::UnknownFlow(request.flow.clone()))?;

        let document = merge_request_document(&request, flow)?;
        flow.input_schema.validate(&document)?;

        let mut parts = flow.template.compose(&document)?;
        parts.push(PromptPart::Text(response_instructions(&flow.output_schema)));

        let model = flow
            .model
            .clone()
            .unwrap_or_else(|| self.defaults.model.clone());
        let temperature = flow.temperature.unwrap_or(self.defaults.temperature);

        info!(
            flow = flow.name,
            request_id = %request.request_id,
            model = %model,
            part_count = parts.len(),
            "dispatching reasoning request"
        );

        let generate = GenerateRequest {
            flow: flow.name.to_string(),
            model,
            temperature,
            parts,
        };

        let candidate = match self.reasoner.generate(generate).await {
            Ok(candidate) => candidate,
            Err(err) => match &flow.fallback {
                FallbackPolicy::Default(value) => {
                    warn!(
                        flow = flow.name,
                        request_id = %request.request_id,
                        error = %err,
                        "reasoning call failed, degrading to flow default"
                    );
                    return Ok(value.clone());
                }
                FallbackPolicy::Fail => return Err(FlowError::Invocation(err)),
            },
        };

        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Some(text) = candidate.text() {
                debug!(
                    flow = flow.name,
                    candidate = %truncate_for_log(text, MAX_CANDIDATE_LOG_CHARS),
                    "raw candidate"
                );
            }
        }

        match accept(&candidate, &flow.output_schema) {
            Some(value) => Ok(value),
            None => match &flow.fallback {
                FallbackPolicy::Default(value) => {
                    warn!(
                        flow = flow.name,
                        request_id = %request.request_id,
                        "candidate missing or invalid, degrading to flow default"
                    );
                    Ok(value.clone())
                }
                FallbackPolicy::Fail => Err(FlowError::Output(flow.name.to_string())),
            },
        }
    }
}

/// Accept a schema-valid candidate unchanged, or nothing.
///
/// Accepted values pass through as-is: no clamping, no reinterpretation
/// beyond what the schema already declares.
pub fn accept(candidate: &ReasoningCandidate, schema: &Schema) -> Option<Value> {
    let text = candidate.text()?;
    let json = extract_json(text)?;
    let value: Value = serde_json::from_str(&json).ok()?;
    schema.validate(&value).ok()?;
    Some(value)
}

/// Merge the typed payload and the historical context into one document.
///
/// Context entries become string fields alongside the payload, so one schema
/// covers the whole request. A key supplied on both sides is a caller bug.
fn merge_request_document(
    request: &FlowRequest,
    flow: &FlowDefinition,
) -> Result<Value, FlowError> {
    let mut document = match request.payload.as_object() {
        Some(map) => map.clone(),
        None => {
            return Err(FlowError::Input(SchemaViolations::single(
                flow.input_schema.name,
                "$",
                "payload must be a JSON object",
            )))
        }
    };
    for (key, blob) in request.context.entries() {
        if document.contains_key(key) {
            return Err(FlowError::Input(SchemaViolations::single(
                flow.input_schema.name,
                key,
                "field supplied both in payload and historical context",
            )));
        }
        document.insert(key.to_string(), Value::String(blob.to_string()));
    }
    Ok(Value::Object(document))
}

fn extract_json(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(text[start..=end].to_string())
}

/// Truncate long payloads for log output.
pub fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_string();
    }
    let mut preview: String = input.chars().take(max_chars).collect();
    preview.push_str(&format!("... [truncated, total_chars={}]", char_count));
    preview
}
