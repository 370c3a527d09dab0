pub mod error;
pub mod handlers;
pub mod request_log;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::{config::ServerConfig, forecast::Forecaster, store::SensorStore};

pub use error::ApiError;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SensorStore>,
    pub forecaster: Arc<dyn Forecaster>,
    pub model_label: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn SensorStore>, forecaster: Arc<dyn Forecaster>, model_label: &str) -> Self {
        Self {
            store,
            forecaster,
            model_label: Arc::from(model_label),
        }
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/send", post(handlers::send))
        .route("/current", get(handlers::current))
        .route("/history", get(handlers::history))
        .route("/predict", get(handlers::predict))
        .layer(middleware::from_fn(request_log::log_request))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the listener fails.
pub async fn serve(state: AppState, cfg: &ServerConfig) -> anyhow::Result<()> {
    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;

    tracing::info!(%addr, "sensor hub listening");

    let app = router(state, cfg.max_body_bytes);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
