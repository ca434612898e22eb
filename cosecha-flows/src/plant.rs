//! Plant diagnosis flow.
//!
//! Generative-class. The only flow that embeds binary media: the plant
//! photograph travels as an inline part next to the textual description, so
//! it needs a backend with native media support. Output field names are the
//! Spanish wire names the UI renders.

use serde::{Deserialize, Serialize};

use cosecha_core::composer::PromptTemplate;
use cosecha_core::flow::{FallbackPolicy, FlowDefinition};
use cosecha_core::pipeline::{FlowError, FlowRequest, Pipeline};
use cosecha_core::reasoner::Reasoner;
use cosecha_core::schema::{FieldKind, FieldSpec, Schema, TextRule};

use crate::BootstrapError;

pub const FLOW_NAME: &str = "diagnose_plant";

const TEMPLATE: &str = "\
You are an expert phytopathologist for berry crops.

A field worker photographed a plant that looks unhealthy:
{{media photoDataUri}}

Worker's description of the symptoms:
{{description}}

Diagnose the plant. Name the most likely diagnosis, list the plausible
alternatives with how probable each one is, and give one general
recommendation the crew should start with. Write all text in Spanish.
";

/// A photographed plant sample.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantSample {
    /// Photograph as a base64 data URI.
    pub photo_data_uri: String,
    /// Worker's description of the symptoms.
    pub description: String,
}

/// One candidate diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisCandidate {
    pub nombre: String,
    /// Probability in percent, 0–100.
    pub probabilidad: f64,
    pub descripcion: String,
}

/// Full diagnosis returned to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantDiagnosis {
    pub diagnostico_principal: String,
    pub posibles_diagnosticos: Vec<DiagnosisCandidate>,
    pub recomendacion_general: String,
}

pub(crate) fn definition() -> Result<FlowDefinition, BootstrapError> {
    let input = Schema::new("plant_sample")
        .field(FieldSpec::required(
            "photoDataUri",
            FieldKind::text_matching(TextRule::DataUri),
        ))
        .field(FieldSpec::required(
            "description",
            FieldKind::text_matching(TextRule::NonEmpty),
        ));

    let candidate = Schema::new("diagnosis_candidate")
        .field(FieldSpec::required("nombre", FieldKind::text()))
        .field(FieldSpec::required(
            "probabilidad",
            FieldKind::number_range(0.0, 100.0),
        ))
        .field(FieldSpec::required("descripcion", FieldKind::text()));
    let output = Schema::new("plant_diagnosis")
        .field(FieldSpec::required(
            "diagnosticoPrincipal",
            FieldKind::text(),
        ))
        .field(FieldSpec::required(
            "posiblesDiagnosticos",
            FieldKind::list_bounded(FieldKind::Object(candidate), Some(1), Some(3)),
        ))
        .field(FieldSpec::required(
            "recomendacionGeneral",
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

/// Diagnose a plant from a photograph and a symptom description.
pub async fn diagnose_plant<R: Reasoner>(
    pipeline: &Pipeline<R>,
    sample: &PlantSample,
) -> Result<PlantDiagnosis, FlowError> {
    let payload = serde_json::to_value(sample)?;
    let request = FlowRequest::new(FLOW_NAME, payload);
    let value = pipeline.run(request).await?;
    Ok(serde_json::from_value(value)?)
}
