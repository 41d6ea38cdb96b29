// HTTP request handlers

use crate::datasource::FetchError;
use crate::protocol::{
    DataRequest, DataResponse, ErrorBody, HealthResponse, TopicsRequest, TopicsResponse,
};
use crate::registry::guarded;
use crate::server::ServerState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// A fetch failure rendered as an error body with the matching status
pub struct ApiError(pub FetchError);

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────────

/// Health check endpoint
pub async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    state.metrics.inc_availability_checks();
    let probe = AssertUnwindSafe(state.source.check_availability()).catch_unwind();
    let available = match tokio::time::timeout(state.timeout, probe).await {
        Ok(result) => result.unwrap_or(false),
        Err(_) => false,
    };

    Json(HealthResponse {
        available,
        source: state.source.name().to_string(),
    })
}

/// Topics for a question
pub async fn topics(
    State(state): State<ServerState>,
    Json(req): Json<TopicsRequest>,
) -> Result<Json<TopicsResponse>, ApiError> {
    state.metrics.inc_topics();
    match guarded(state.timeout, state.source.fetch_topics(req.count, &req.input)).await {
        Ok(mut topics) => {
            topics.truncate(req.count);
            Ok(Json(TopicsResponse { topics }))
        }
        Err(e) => {
            state.metrics.record_error(e.kind());
            tracing::warn!("fetch_topics failed: {}", e);
            Err(e.into())
        }
    }
}

/// Data for a topic
pub async fn data(
    State(state): State<ServerState>,
    Json(req): Json<DataRequest>,
) -> Result<Json<DataResponse>, ApiError> {
    state.metrics.inc_data();
    match guarded(state.timeout, state.source.fetch_data(req.count, req.topic_id)).await {
        Ok(mut data) => {
            data.truncate(req.count);
            Ok(Json(DataResponse { data }))
        }
        Err(e) => {
            state.metrics.record_error(e.kind());
            tracing::warn!("fetch_data failed for topic {}: {}", req.topic_id, e);
            Err(e.into())
        }
    }
}

/// Counter snapshot
pub async fn metrics(State(state): State<ServerState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}
