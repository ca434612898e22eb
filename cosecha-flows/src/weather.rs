//! Weather-risk alerting flow.
//!
//! Generative-class: alerts are free-form risk narratives with a structured
//! urgency level. There is no safe default alert, so a missing or invalid
//! candidate surfaces as a hard failure instead of fabricated content.

use serde::{Deserialize, Serialize};

use cosecha_core::composer::PromptTemplate;
use cosecha_core::flow::{FallbackPolicy, FlowDefinition};
use cosecha_core::pipeline::{FlowError, FlowRequest, HistoricalContext, Pipeline};
use cosecha_core::reasoner::Reasoner;
use cosecha_core::schema::{FieldKind, FieldSpec, Schema, TextRule};

use crate::BootstrapError;

pub const FLOW_NAME: &str = "generate_weather_alerts";

/// Wire values for [`Urgency`], as enforced on the output schema.
const URGENCY_VALUES: [&str; 3] = ["Alta", "Media", "Baja"];

const TEMPLATE: &str = "\
You are an agronomic risk advisor for a berry farm.

Upcoming weather forecast:
{{weatherForecast}}

Recent phenology observations from the field log:
{{phenologyLogs}}

Cross the forecast against the crop's current phenological stage and produce
the risks worth acting on (frost during flowering, hail on ripe fruit, heat
stress, disease pressure after rain). For every risk give a concrete
recommendation a field crew can execute. Write risk and recommendation in
Spanish.
";

/// Alert urgency, serialized with the Spanish wire values the UI renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    #[serde(rename = "Alta")]
    High,
    #[serde(rename = "Media")]
    Medium,
    #[serde(rename = "Baja")]
    Low,
}

/// One actionable weather risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherAlert {
    pub risk: String,
    pub recommendation: String,
    pub urgency: Urgency,
}

#[derive(Debug, Deserialize)]
struct WeatherAlerts {
    alerts: Vec<WeatherAlert>,
}

pub(crate) fn definition() -> Result<FlowDefinition, BootstrapError> {
    let input = Schema::new("weather_alert_request")
        .field(FieldSpec::required(
            "weatherForecast",
            FieldKind::text_matching(TextRule::NonEmpty),
        ))
        .field(FieldSpec::required("phenologyLogs", FieldKind::text()));

    let alert = Schema::new("weather_alert")
        .field(FieldSpec::required("risk", FieldKind::text()))
        .field(FieldSpec::required("recommendation", FieldKind::text()))
        .field(FieldSpec::required(
            "urgency",
            FieldKind::choice(&URGENCY_VALUES),
        ));
    let output = Schema::new("weather_alerts").field(FieldSpec::required(
        "alerts",
        FieldKind::list_bounded(FieldKind::Object(alert), Some(1), None),
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

/// Generate weather-risk alerts from a forecast and the field's phenology log.
pub async fn generate_weather_alerts<R: Reasoner>(
    pipeline: &Pipeline<R>,
    weather_forecast: &str,
    phenology_logs: &str,
) -> Result<Vec<WeatherAlert>, FlowError> {
    let payload = serde_json::json!({ "weatherForecast": weather_forecast });
    let request = FlowRequest::new(FLOW_NAME, payload)
        .with_context(HistoricalContext::new().with("phenologyLogs", phenology_logs));
    let value = pipeline.run(request).await?;
    let parsed: WeatherAlerts = serde_json::from_value(value)?;
    Ok(parsed.alerts)
}
