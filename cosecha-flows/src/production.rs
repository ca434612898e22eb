//! Harvest production validation flow.
//!
//! Judgment-class: the verdict is a structured accept/reject. A reasoner
//! outage or a malformed verdict degrades to an optimistic accept so that
//! data entry is never blocked on an inference failure.

use serde::{Deserialize, Serialize};
use serde_json::json;

use cosecha_core::composer::PromptTemplate;
use cosecha_core::flow::{FallbackPolicy, FlowDefinition};
use cosecha_core::pipeline::{FlowError, FlowRequest, HistoricalContext, Pipeline};
use cosecha_core::reasoner::Reasoner;
use cosecha_core::schema::{FieldKind, FieldSpec, Schema, TextRule};

use crate::BootstrapError;

pub const FLOW_NAME: &str = "validate_production_data";

const TEMPLATE: &str = "\
You are an agricultural production auditor for a berry farm.

A farmer reported a new harvest batch:
- Batch id: {{batchId}}
- Farmer id: {{farmerId}}
- Kilograms in this batch: {{kilosPerBatch}}
- Farmer's average kilograms per batch: {{averageKilosPerBatch}}

Historical batches for this farmer, for comparison:
{{historicalData}}

Judge whether the reported weight is plausible against the farmer's average
and history. Accept normal variation; flag only clear anomalies such as
order-of-magnitude deviations. If the batch is implausible, explain why in
Spanish, briefly and politely, so the reason can be shown to farm staff.
";

/// A reported harvest batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionBatch {
    pub kilos_per_batch: f64,
    pub batch_id: String,
    pub farmer_id: String,
    pub average_kilos_per_batch: f64,
}

/// Verdict on a reported batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionValidation {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub(crate) fn definition() -> Result<FlowDefinition, BootstrapError> {
    let input = Schema::new("production_batch")
        .field(FieldSpec::required(
            "kilosPerBatch",
            FieldKind::number_min(0.0),
        ))
        .field(FieldSpec::required(
            "batchId",
            FieldKind::text_matching(TextRule::LetterThenDigits(3)),
        ))
        .field(FieldSpec::required(
            "farmerId",
            FieldKind::text_matching(TextRule::NonEmpty),
        ))
        .field(FieldSpec::required(
            "averageKilosPerBatch",
            FieldKind::number_min(0.0),
        ))
        .field(FieldSpec::required("historicalData", FieldKind::text()));

    let output = Schema::new("production_validation")
        .field(FieldSpec::required("isValid", FieldKind::Bool))
        .field(FieldSpec::optional("reason", FieldKind::text()));

    let template = PromptTemplate::parse(TEMPLATE).map_err(|source| BootstrapError::Template {
        flow: FLOW_NAME,
        source,
    })?;

    Ok(FlowDefinition::new(
        FLOW_NAME,
        input,
        output,
        template,
        // A missing validation opinion must never stop data entry.
        FallbackPolicy::Default(json!({"isValid": true})),
    ))
}

/// Validate a reported harvest batch against the farmer's history.
pub async fn validate_production_data<R: Reasoner>(
    pipeline: &Pipeline<R>,
    batch: &ProductionBatch,
    historical_data: &str,
) -> Result<ProductionValidation, FlowError> {
    let payload = serde_json::to_value(batch)?;
    let request = FlowRequest::new(FLOW_NAME, payload)
        .with_context(HistoricalContext::new().with("historicalData", historical_data));
    let verdict = pipeline.run(request).await?;
    Ok(serde_json::from_value(verdict)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_schema_rejects_short_batch_id() {
        let definition = definition().unwrap();
        let document = json!({
            "kilosPerBatch": 400.0,
            "batchId": "L42",
            "farmerId": "F1",
            "averageKilosPerBatch": 400.0,
            "historicalData": "[]"
        });
        assert!(definition.input_schema.validate(&document).is_err());
    }

    #[test]
    fn test_input_schema_accepts_valid_batch() {
        let definition = definition().unwrap();
        let document = json!({
            "kilosPerBatch": 400.0,
            "batchId": "L014",
            "farmerId": "F1",
            "averageKilosPerBatch": 400.0,
            "historicalData": "[]"
        });
        assert!(definition.input_schema.validate(&document).is_ok());
    }

    #[test]
    fn test_verdict_wire_format() {
        let verdict: ProductionValidation =
            serde_json::from_value(json!({"isValid": false, "reason": "desviación extrema"}))
                .unwrap();
        assert!(!verdict.is_valid);
        assert_eq!(verdict.reason.as_deref(), Some("desviación extrema"));

        let fallback: ProductionValidation = serde_json::from_value(json!({"isValid": true})).unwrap();
        assert!(fallback.is_valid);
        assert!(fallback.reason.is_none());
    }
}
