use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use sensor_client::SensorRecord;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use time::{
    format_description::well_known::Rfc3339,
    macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime,
};

use super::{error::ApiError, AppState};
use crate::{
    normalize::normalize,
    store::{HistoryQuery, StoreError, DEFAULT_HISTORY_LIMIT},
};

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "time": now_rfc3339() }))
}

/// Bodies are read as JSON whatever the content type; devices are not
/// consistent about sending one. Non-object JSON carries no fields.
fn parse_payload(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(Map::new()),
        Err(e) => Err(ApiError::Validation(format!("Invalid JSON body: {e}"))),
    }
}

pub async fn send(State(state): State<AppState>, body: Bytes) -> Result<(StatusCode, Json<Value>), ApiError> {
    metrics::counter!("http_send_requests_total").increment(1);

    let payload = parse_payload(&body)?;
    let fields = normalize(&payload);
    if !fields.has_values() {
        metrics::counter!("readings_rejected_total").increment(1);
        return Err(ApiError::Validation("No valid sensor fields in body".to_string()));
    }

    let reading = fields.to_reading().map_err(StoreError::from)?;
    let inserted = state.store.insert(&reading).await?;

    metrics::counter!("readings_saved_total").increment(1);
    tracing::info!(id = %inserted.id, fields = fields.len(), "saved reading");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Data saved",
            "id": inserted.id,
            "data": fields,
        })),
    ))
}

pub async fn current(State(state): State<AppState>) -> Result<Json<SensorRecord>, ApiError> {
    state
        .store
        .latest()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No data available".to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub limit: Option<String>,
}

/// RFC 3339, or a bare date / offset-less date-time taken as UTC.
fn parse_instant(name: &str, raw: Option<&str>) -> Result<Option<OffsetDateTime>, ApiError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(Some(ts));
    }
    let local = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(ts) = PrimitiveDateTime::parse(raw, &local) {
        return Ok(Some(ts.assume_utc()));
    }
    if let Ok(date) = Date::parse(raw, &format_description!("[year]-[month]-[day]")) {
        return Ok(Some(date.midnight().assume_utc()));
    }

    Err(ApiError::Validation(format!("Invalid '{name}' timestamp: {raw}")))
}

/// Positive integers only; anything else falls back to the default.
fn parse_limit(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
}

impl HistoryParams {
    pub fn to_query(&self) -> Result<HistoryQuery, ApiError> {
        Ok(HistoryQuery {
            start: parse_instant("start", self.start.as_deref())?,
            end: parse_instant("end", self.end.as_deref())?,
            limit: parse_limit(self.limit.as_deref()),
        })
    }
}

pub async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<SensorRecord>>, ApiError> {
    let query = params.to_query()?;
    let rows = state.store.history(&query).await?;
    tracing::debug!(rows = rows.len(), limit = query.limit, "history query");
    Ok(Json(rows))
}

pub async fn predict(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    metrics::counter!("prediction_requests_total").increment(1);

    let predictions = state.forecaster.forecast().await?;

    Ok(Json(json!({
        "success": true,
        "predictions": predictions,
        "units": {
            "watt": "Watts",
            "temperature": "Celsius",
            "humidity": "%",
        },
        "model": &*state.model_label,
    })))
}
