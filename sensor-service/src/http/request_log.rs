use std::net::SocketAddr;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, FromRequest, Request},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Log method, path and caller for every request, plus the raw body of
/// POSTs. The body is buffered under the router's `DefaultBodyLimit` and
/// handed on unchanged.
pub async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let caller = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info!(%method, %path, %caller, "request");

    let request = if method == Method::POST {
        let (parts, body) = request.into_parts();
        // The body limit travels in the extensions.
        let mut limited = Request::new(body);
        *limited.extensions_mut() = parts.extensions.clone();

        let bytes = match Bytes::from_request(limited, &()).await {
            Ok(bytes) => bytes,
            Err(rejection) => {
                tracing::warn!(%method, %path, error = %rejection.body_text(), "could not read request body");
                return (rejection.status(), Json(json!({ "error": rejection.body_text() }))).into_response();
            }
        };
        tracing::info!(body = %String::from_utf8_lossy(&bytes), "request body");
        Request::from_parts(parts, Body::from(bytes))
    } else {
        request
    };

    let response = next.run(request).await;
    tracing::debug!(%method, %path, status = response.status().as_u16(), "response");
    response
}
