//! Agronomist report summarization flow.
//!
//! Generative-class: condenses raw field logs into a technical analysis and
//! a conclusions section for the weekly report.

use serde::{Deserialize, Serialize};

use cosecha_core::composer::PromptTemplate;
use cosecha_core::flow::{FallbackPolicy, FlowDefinition};
use cosecha_core::pipeline::{FlowError, FlowRequest, HistoricalContext, Pipeline};
use cosecha_core::reasoner::Reasoner;
use cosecha_core::schema::{FieldKind, FieldSpec, Schema, TextRule};

use crate::BootstrapError;

pub const FLOW_NAME: &str = "summarize_agronomist_report";

const TEMPLATE: &str = "\
You are the lead agronomist writing the weekly technical report for a berry
farm.

Raw agronomist visit logs:
{{agronomistLogs}}

Phenology observations for the same period:
{{phenologyLogs}}

Write two sections in Spanish: a technical analysis of crop status and
observed issues, and a conclusions-and-recommendations section with the
actions for next week.
";

/// Summarized weekly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub technical_analysis: String,
    pub conclusions_and_recommendations: String,
}

pub(crate) fn definition() -> Result<FlowDefinition, BootstrapError> {
    let input = Schema::new("report_request")
        .field(FieldSpec::required(
            "agronomistLogs",
            FieldKind::text_matching(TextRule::NonEmpty),
        ))
        .field(FieldSpec::required("phenologyLogs", FieldKind::text()));

    let output = Schema::new("report_summary")
        .field(FieldSpec::required("technicalAnalysis", FieldKind::text()))
        .field(FieldSpec::required(
            "conclusionsAndRecommendations",
            FieldKind::text(),
        ));

    let template = PromptTemplate::parse(TEMPLATE).map_err(|source| BootstrapError::Template {
        flow: FLOW_NAME,
        source,
    })?;

    Ok(FlowDefinition::new(
        FLOW_NAME,
        input,
        output,
        template,
        FallbackPolicy::Fail,
    ))
}

/// Summarize agronomist and phenology logs into the weekly report sections.
pub async fn summarize_agronomist_report<R: Reasoner>(
    pipeline: &Pipeline<R>,
    agronomist_logs: &str,
    phenology_logs: &str,
) -> Result<ReportSummary, FlowError> {
    let request = FlowRequest::new(FLOW_NAME, serde_json::json!({})).with_context(
        HistoricalContext::new()
            .with("agronomistLogs", agronomist_logs)
            .with("phenologyLogs", phenology_logs),
    );
    let value = pipeline.run(request).await?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_schema_rejects_empty_logs() {
        let definition = definition().unwrap();
        let document = json!({"agronomistLogs": "", "phenologyLogs": ""});
        assert!(definition.input_schema.validate(&document).is_err());
    }

    #[test]
    fn test_summary_wire_names() {
        let value = json!({
            "technicalAnalysis": "El cultivo avanza bien.",
            "conclusionsAndRecommendations": "Reforzar el riego."
        });
        let summary: ReportSummary = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&summary).unwrap(), value);
    }
}
