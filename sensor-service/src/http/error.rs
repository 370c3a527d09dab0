use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{forecast::ForecastError, store::StoreError};

/// Everything a handler can fail with. Each variant maps to one status code
/// and a JSON body; nothing here brings the process down.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(message) => {
                tracing::warn!(error = %message, "rejected request");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Self::NotFound(message) => {
                tracing::info!(error = %message, "nothing to return");
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            Self::Store(e) => {
                tracing::error!(error = %e, "store operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response()
            }
            Self::Forecast(e) => {
                tracing::error!(error = %e, "prediction failed");
                metrics::counter!("prediction_failures_total").increment(1);

                let mut body = json!({ "success": false });
                match &e {
                    ForecastError::InvalidOutput(_) => {
                        body["error"] = json!("Invalid output from prediction script");
                    }
                    _ => {
                        body["error"] = json!("Prediction failed");
                        if let Some(details) = e.client_details() {
                            body["details"] = json!(details);
                        }
                    }
                }
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
