// HTTP middleware

use crate::datasource::{FetchError, FetchErrorKind};
use crate::observability::request_id;
use crate::protocol::API_KEY_HEADER;
use crate::server::handlers::ApiError;
use crate::server::ServerState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request tracing middleware; tags every response with a request id
pub async fn trace_request_mw(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(request_id);
    let start = Instant::now();

    tracing::debug!("→ {} {} [{}]", method, uri, id);

    let mut response = next.run(request).await;

    tracing::debug!(
        "← {} {} {} ({:?}) [{}]",
        method,
        uri,
        response.status().as_u16(),
        start.elapsed(),
        id
    );

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Reject requests without the configured API key
pub async fn require_api_key(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided == Some(expected) {
        next.run(request).await
    } else {
        ApiError(FetchError::new(
            FetchErrorKind::Authentication,
            "missing or invalid API key",
        ))
        .into_response()
    }
}
