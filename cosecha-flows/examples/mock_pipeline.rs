//! Pipeline walkthrough against the scriptable reasoner.

use std::sync::Arc;

use cosecha_core::pipeline::Pipeline;
use cosecha_flows::{
    build_registry, generate_weather_alerts, validate_production_data, ProductionBatch,
};
use cosecha_reasoners::MockReasoner;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_target(false)
        .compact()
        .init();

    let registry = Arc::new(build_registry()?);

    // Judgment flow: the scripted verdict flags the 100x deviation.
    let mock = MockReasoner::replying(
        r#"{"isValid": false, "reason": "El lote reporta 100 veces el promedio del agricultor."}"#,
    );
    let pipeline = Pipeline::new(Arc::clone(&registry), mock);

    let batch = ProductionBatch {
        kilos_per_batch: 40_000.0,
        batch_id: "L014".to_string(),
        farmer_id: "F1".to_string(),
        average_kilos_per_batch: 400.0,
    };
    let verdict = validate_production_data(&pipeline, &batch, "[{\"kilos\": 410}]").await?;
    info!(is_valid = verdict.is_valid, reason = ?verdict.reason, "production verdict");

    // Same flow with a silent reasoner: degrades to an optimistic accept.
    let pipeline = Pipeline::new(Arc::clone(&registry), MockReasoner::new());
    let verdict = validate_production_data(&pipeline, &batch, "[]").await?;
    info!(is_valid = verdict.is_valid, "verdict under reasoner outage");

    // Generative flow: a silent reasoner is a hard failure instead.
    let pipeline = Pipeline::new(Arc::clone(&registry), MockReasoner::new());
    match generate_weather_alerts(&pipeline, "helada nocturna", "floración").await {
        Ok(_) => unreachable!("mock produced no candidate"),
        Err(err) => info!(%err, "weather alerts failed explicitly"),
    }

    Ok(())
}
