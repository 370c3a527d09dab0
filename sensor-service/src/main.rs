use std::sync::Arc;

use anyhow::Result;
use sensor_service::{
    bootstrap,
    config::AppConfig,
    http::{self, AppState},
    metrics_server, observability, PgSensorStore, ProcessForecaster,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "sensor hub stopped");
        return Err(e);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let cfg = AppConfig::load()?;
    let uri = cfg.store.require_uri()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // Refuse to serve without a store.
    let store = PgSensorStore::connect(uri, cfg.store.max_connections).await?;
    tracing::info!("connected to store");

    if cfg.store.seed_sample {
        bootstrap::seed_if_empty(&store).await?;
    }

    let forecaster = ProcessForecaster::from_config(&cfg.forecast);
    tracing::info!(
        program = %cfg.forecast.program,
        script = %cfg.forecast.script.display(),
        timeout = ?cfg.forecast.timeout(),
        "forecaster configured"
    );

    let state = AppState::new(Arc::new(store), Arc::new(forecaster), &cfg.forecast.model_label);
    http::serve(state, &cfg.server).await
}
