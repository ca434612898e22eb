//! End-to-end flow tests against the scriptable reasoner.

use std::sync::Arc;

use serde_json::json;

use cosecha_core::pipeline::{FlowError, FlowRequest, Pipeline};
use cosecha_core::reasoner::ReasonerError;
use cosecha_flows::{
    build_registry, diagnose_plant, generate_weather_alerts, summarize_agronomist_report,
    validate_packaging_data, validate_production_data, PackagingShift, PlantSample,
    ProductionBatch, Urgency,
};
use cosecha_reasoners::MockReasoner;

const TINY_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

fn pipeline(mock: MockReasoner) -> Pipeline<MockReasoner> {
    let registry = Arc::new(build_registry().expect("registry builds"));
    Pipeline::new(registry, mock)
}

fn sample_batch() -> ProductionBatch {
    ProductionBatch {
        kilos_per_batch: 40_000.0,
        batch_id: "L014".to_string(),
        farmer_id: "F1".to_string(),
        average_kilos_per_batch: 400.0,
    }
}

#[tokio::test]
async fn production_verdict_passes_through_unchanged() {
    let mock = MockReasoner::replying(
        r#"{"isValid": false, "reason": "El lote reporta 100 veces el promedio del agricultor."}"#,
    );
    let pipeline = pipeline(mock);

    let verdict = validate_production_data(&pipeline, &sample_batch(), "[{\"kilos\": 410}]")
        .await
        .unwrap();

    assert!(!verdict.is_valid);
    let reason = verdict.reason.expect("reason should survive acceptance");
    assert!(reason.contains("100 veces"));
}

#[tokio::test]
async fn production_degrades_to_accept_when_reasoner_fails() {
    let mock = MockReasoner::failing(ReasonerError::Http("connect timeout".to_string()));
    let pipeline = pipeline(mock);

    let verdict = validate_production_data(&pipeline, &sample_batch(), "[]")
        .await
        .unwrap();

    assert!(verdict.is_valid);
    assert!(verdict.reason.is_none());
}

#[tokio::test]
async fn production_degrades_to_accept_on_malformed_candidate() {
    let mock = MockReasoner::replying("definitely not json");
    let pipeline = pipeline(mock);

    let verdict = validate_production_data(&pipeline, &sample_batch(), "[]")
        .await
        .unwrap();

    assert!(verdict.is_valid);
    assert!(verdict.reason.is_none());
}

#[tokio::test]
async fn production_rejects_bad_batch_id_before_dispatch() {
    let mock = MockReasoner::replying(r#"{"isValid": true}"#);
    let pipeline = pipeline(mock);

    let batch = ProductionBatch {
        batch_id: "L42".to_string(),
        ..sample_batch()
    };
    let err = validate_production_data(&pipeline, &batch, "[]")
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::Input(_)));
    assert!(
        pipeline.registry().get("validate_production_data").is_some(),
        "flow exists; rejection came from the input schema"
    );
}

// Capture-based assertions need the mock on the outside of the pipeline;
// Arc keeps one handle for the test and one for the pipeline.
fn pipeline_with_capture(mock: &Arc<MockReasoner>) -> Pipeline<Arc<MockReasoner>> {
    let registry = Arc::new(build_registry().expect("registry builds"));
    Pipeline::new(registry, Arc::clone(mock))
}

#[tokio::test]
async fn input_rejection_never_reaches_the_reasoner() {
    let mock = Arc::new(MockReasoner::new());
    let pipeline = pipeline_with_capture(&mock);

    let batch = ProductionBatch {
        kilos_per_batch: -5.0,
        ..sample_batch()
    };
    let result = validate_production_data(&pipeline, &batch, "[]").await;

    assert!(matches!(result, Err(FlowError::Input(_))));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn packaging_degrades_to_accept_when_reasoner_goes_silent() {
    let mock = MockReasoner::new();
    let pipeline = pipeline(mock);

    let shift = PackagingShift {
        kilograms_packaged: 900.0,
        packer_id: "P7".to_string(),
        hours_worked: 8.0,
        cost_per_hour: 6.5,
    };
    let verdict = validate_packaging_data(&pipeline, &shift, "[]").await.unwrap();

    assert!(verdict.is_valid);
    assert!(verdict.reason.is_none());
}

#[tokio::test]
async fn weather_alerts_surface_frost_during_flowering() {
    let reply = json!({"alerts": [
        {
            "risk": "Helada nocturna durante la floración",
            "recommendation": "Activar riego antihelada antes del amanecer",
            "urgency": "Alta"
        },
        {
            "risk": "Viento moderado",
            "recommendation": "Revisar túneles",
            "urgency": "Baja"
        }
    ]});
    let mock = MockReasoner::replying(reply.to_string());
    let pipeline = pipeline(mock);

    let alerts = generate_weather_alerts(
        &pipeline,
        "Se espera helada nocturna con mínimas de -2°C",
        "Cultivo en plena floración",
    )
    .await
    .unwrap();

    assert!(!alerts.is_empty());
    assert_eq!(alerts[0].urgency, Urgency::High);
    assert!(alerts[0].risk.contains("Helada"));
}

#[tokio::test]
async fn weather_fails_hard_when_no_candidate_is_produced() {
    let pipeline = pipeline(MockReasoner::new());

    let err = generate_weather_alerts(&pipeline, "despejado", "en reposo")
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::Output(flow) if flow == "generate_weather_alerts"));
}

#[tokio::test]
async fn weather_invocation_failure_surfaces_for_retry() {
    let pipeline = pipeline(MockReasoner::failing(ReasonerError::Http(
        "503".to_string(),
    )));

    let err = generate_weather_alerts(&pipeline, "despejado", "en reposo")
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::Invocation(_)));
}

#[tokio::test]
async fn weather_rejects_empty_alert_list() {
    let pipeline = pipeline(MockReasoner::replying(r#"{"alerts": []}"#));

    let err = generate_weather_alerts(&pipeline, "despejado", "en reposo")
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::Output(_)));
}

fn sample_plant() -> PlantSample {
    PlantSample {
        photo_data_uri: format!("data:image/png;base64,{}", TINY_PNG),
        description: "Hojas amarillas con manchas marrones".to_string(),
    }
}

#[tokio::test]
async fn diagnosis_accepts_one_to_three_candidates() {
    let reply = json!({
        "diagnosticoPrincipal": "Botrytis cinerea",
        "posiblesDiagnosticos": [
            {"nombre": "Botrytis cinerea", "probabilidad": 70.0, "descripcion": "Moho gris en fruta"},
            {"nombre": "Oídio", "probabilidad": 20.0, "descripcion": "Polvo blanco en hojas"}
        ],
        "recomendacionGeneral": "Retirar fruta afectada y mejorar ventilación"
    });
    let pipeline = pipeline(MockReasoner::replying(reply.to_string()));

    let diagnosis = diagnose_plant(&pipeline, &sample_plant()).await.unwrap();

    assert_eq!(diagnosis.diagnostico_principal, "Botrytis cinerea");
    assert!((1..=3).contains(&diagnosis.posibles_diagnosticos.len()));
    for candidate in &diagnosis.posibles_diagnosticos {
        assert!((0.0..=100.0).contains(&candidate.probabilidad));
    }
}

#[tokio::test]
async fn diagnosis_rejects_out_of_range_probability() {
    let reply = json!({
        "diagnosticoPrincipal": "Botrytis",
        "posiblesDiagnosticos": [
            {"nombre": "Botrytis", "probabilidad": 150.0, "descripcion": "fuera de rango"}
        ],
        "recomendacionGeneral": "n/a"
    });
    let pipeline = pipeline(MockReasoner::replying(reply.to_string()));

    let err = diagnose_plant(&pipeline, &sample_plant()).await.unwrap_err();
    assert!(matches!(err, FlowError::Output(_)));
}

#[tokio::test]
async fn diagnosis_request_carries_the_photo_as_media() {
    let mock = Arc::new(MockReasoner::new());
    mock.push_reply(
        json!({
            "diagnosticoPrincipal": "Oídio",
            "posiblesDiagnosticos": [
                {"nombre": "Oídio", "probabilidad": 80.0, "descripcion": "Polvo blanco"}
            ],
            "recomendacionGeneral": "Aplicar azufre"
        })
        .to_string(),
    );
    let pipeline = pipeline_with_capture(&mock);

    diagnose_plant(&pipeline, &sample_plant()).await.unwrap();

    let request = mock.last_request().expect("one request dispatched");
    assert!(request.has_media());
    assert_eq!(request.flow, "diagnose_plant");
}

#[tokio::test]
async fn report_summary_round_trips() {
    let reply = json!({
        "technicalAnalysis": "El cultivo muestra estrés hídrico moderado.",
        "conclusionsAndRecommendations": "Aumentar riego un 15% la próxima semana."
    });
    let pipeline = pipeline(MockReasoner::replying(reply.to_string()));

    let summary = summarize_agronomist_report(
        &pipeline,
        "Visita del lunes: suelo seco en sector 3.",
        "Fructificación temprana.",
    )
    .await
    .unwrap();

    assert!(summary.technical_analysis.contains("estrés hídrico"));
    assert!(summary.conclusions_and_recommendations.contains("riego"));
}

#[tokio::test]
async fn report_fails_hard_on_schema_invalid_candidate() {
    // Missing the conclusions section entirely.
    let pipeline = pipeline(MockReasoner::replying(
        r#"{"technicalAnalysis": "solo una sección"}"#,
    ));

    let err = summarize_agronomist_report(&pipeline, "logs", "feno")
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::Output(_)));
}

#[tokio::test]
async fn composing_the_same_request_twice_is_byte_identical() {
    let mock = Arc::new(MockReasoner::new());
    mock.push_reply(r#"{"isValid": true}"#);
    mock.push_reply(r#"{"isValid": true}"#);
    let pipeline = pipeline_with_capture(&mock);

    let batch = ProductionBatch {
        kilos_per_batch: 400.0,
        ..sample_batch()
    };
    validate_production_data(&pipeline, &batch, "[{\"kilos\": 410}]")
        .await
        .unwrap();
    validate_production_data(&pipeline, &batch, "[{\"kilos\": 410}]")
        .await
        .unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].parts, requests[1].parts);
    assert_eq!(requests[0].model, requests[1].model);
}

#[tokio::test]
async fn unknown_flow_is_a_programming_error() {
    let pipeline = pipeline(MockReasoner::new());
    let err = pipeline
        .run(FlowRequest::new("no_such_flow", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::UnknownFlow(name) if name == "no_such_flow"));
}
