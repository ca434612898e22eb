//! Packaging shift validation flow.
//!
//! Judgment-class, same degradation contract as harvest validation: packers
//! report kilograms packaged, hours worked, and cost per hour for payroll,
//! and an inference failure must never block the report.

use serde::{Deserialize, Serialize};
use serde_json::json;

use cosecha_core::composer::PromptTemplate;
use cosecha_core::flow::{FallbackPolicy, FlowDefinition};
use cosecha_core::pipeline::{FlowError, FlowRequest, HistoricalContext, Pipeline};
use cosecha_core::reasoner::Reasoner;
use cosecha_core::schema::{FieldKind, FieldSpec, Schema, TextRule};

use crate::BootstrapError;

pub const FLOW_NAME: &str = "validate_packaging_data";

const TEMPLATE: &str = "\
You are a payroll auditor for a fruit packaging plant.

A packer reported a new shift:
- Packer id: {{packerId}}
- Kilograms packaged: {{kilogramsPackaged}}
- Hours worked: {{hoursWorked}}
- Cost per hour: {{costPerHour}}

Historical shift reports for this packer, for comparison:
{{historicalPackagingData}}

Judge whether the reported shift is plausible: kilograms consistent with the
packer's history, hours within a realistic working day, cost per hour in line
with prior shifts. If the report is implausible, explain why in Spanish,
briefly and politely, so the reason can be shown to plant staff.
";

/// A reported packaging shift.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingShift {
    pub kilograms_packaged: f64,
    pub packer_id: String,
    pub hours_worked: f64,
    pub cost_per_hour: f64,
}

/// Verdict on a reported shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingValidation {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub(crate) fn definition() -> Result<FlowDefinition, BootstrapError> {
    let input = Schema::new("packaging_shift")
        .field(FieldSpec::required(
            "kilogramsPackaged",
            FieldKind::number_min(0.0),
        ))
        .field(FieldSpec::required(
            "packerId",
            FieldKind::text_matching(TextRule::NonEmpty),
        ))
        .field(FieldSpec::required(
            "hoursWorked",
            FieldKind::number_range(0.0, 24.0),
        ))
        .field(FieldSpec::required(
            "costPerHour",
            FieldKind::number_min(0.0),
        ))
        .field(FieldSpec::required(
            "historicalPackagingData",
            FieldKind::text(),
        ));

    let output = Schema::new("packaging_validation")
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
        FallbackPolicy::Default(json!({"isValid": true})),
    ))
}

/// Validate a reported packaging shift against the packer's history.
pub async fn validate_packaging_data<R: Reasoner>(
    pipeline: &Pipeline<R>,
    shift: &PackagingShift,
    historical_packaging_data: &str,
) -> Result<PackagingValidation, FlowError> {
    let payload = serde_json::to_value(shift)?;
    let request = FlowRequest::new(FLOW_NAME, payload).with_context(
        HistoricalContext::new().with("historicalPackagingData", historical_packaging_data),
    );
    let verdict = pipeline.run(request).await?;
    Ok(serde_json::from_value(verdict)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_schema_bounds_hours() {
        let definition = definition().unwrap();
        let mut document = json!({
            "kilogramsPackaged": 900.0,
            "packerId": "P7",
            "hoursWorked": 8.0,
            "costPerHour": 6.5,
            "historicalPackagingData": "[]"
        });
        assert!(definition.input_schema.validate(&document).is_ok());

        document["hoursWorked"] = json!(30.0);
        assert!(definition.input_schema.validate(&document).is_err());

        document["hoursWorked"] = json!(-1.0);
        assert!(definition.input_schema.validate(&document).is_err());
    }

    #[test]
    fn test_input_schema_rejects_blank_packer() {
        let definition = definition().unwrap();
        let document = json!({
            "kilogramsPackaged": 900.0,
            "packerId": "  ",
            "hoursWorked": 8.0,
            "costPerHour": 6.5,
            "historicalPackagingData": "[]"
        });
        assert!(definition.input_schema.validate(&document).is_err());
    }
}
