//! JSON bodies for serving a data source across a process boundary.
//!
//! | Method/path       | Request          | Response          |
//! |-------------------|------------------|-------------------|
//! | `GET /health`     | -                | [`HealthResponse`] |
//! | `POST /v1/topics` | [`TopicsRequest`] | [`TopicsResponse`] |
//! | `POST /v1/data`   | [`DataRequest`]   | [`DataResponse`]   |
//!
//! Failures carry an [`ErrorBody`] and the status from
//! [`FetchErrorKind::status_code`].

use crate::datasource::{Data, FetchError, FetchErrorKind, NewQuestionInput, Topic};
use serde::{Deserialize, Serialize};

pub const HEALTH_PATH: &str = "/health";
pub const TOPICS_PATH: &str = "/v1/topics";
pub const DATA_PATH: &str = "/v1/data";
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub available: bool,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicsRequest {
    pub count: usize,
    pub input: NewQuestionInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicsResponse {
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRequest {
    pub count: usize,
    #[serde(rename = "topicID")]
    pub topic_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse {
    pub data: Vec<Data>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl From<&FetchError> for ErrorBody {
    fn from(err: &FetchError) -> Self {
        Self {
            error: ErrorDetail {
                kind: err.kind(),
                message: err.message().to_string(),
            },
        }
    }
}

impl From<ErrorBody> for FetchError {
    fn from(body: ErrorBody) -> Self {
        FetchError::new(body.error.kind, body.error.message)
    }
}
