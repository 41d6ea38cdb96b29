// Data source error types

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why an `initialize` call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializationErrorKind {
    MissingCredentials,
    Unreachable,
    InvalidConfiguration,
    Io,
}

impl fmt::Display for InitializationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingCredentials => "missing credentials",
            Self::Unreachable => "endpoint unreachable",
            Self::InvalidConfiguration => "invalid configuration",
            Self::Io => "io error",
        };
        f.write_str(s)
    }
}

/// Raised only by `DataSource::initialize`. Fatal to the instance.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct InitializationError {
    kind: InitializationErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl InitializationError {
    pub fn new(kind: InitializationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn missing_credentials(message: impl Into<String>) -> Self {
        Self::new(InitializationErrorKind::MissingCredentials, message)
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(InitializationErrorKind::Unreachable, message)
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(InitializationErrorKind::InvalidConfiguration, message)
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> InitializationErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for InitializationError {
    fn from(err: std::io::Error) -> Self {
        Self::new(InitializationErrorKind::Io, err.to_string()).with_source(err)
    }
}

/// Structured cause of a fetch failure.
///
/// Callers that only care about success can keep checking `is_err()`; the kind
/// lets a host decide between retrying, skipping and surfacing the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    Timeout,
    Authentication,
    RateLimited,
    MalformedResponse,
    Transport,
    InvalidInput,
    NotInitialized,
    Other,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Authentication => "authentication",
            Self::RateLimited => "rate_limited",
            Self::MalformedResponse => "malformed_response",
            Self::Transport => "transport",
            Self::InvalidInput => "invalid_input",
            Self::NotInitialized => "not_initialized",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised by `fetch_topics` / `fetch_data`. The instance stays usable.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct FetchError {
    kind: FetchErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::InvalidInput, message)
    }

    pub fn not_initialized(source_name: &str) -> Self {
        Self::new(
            FetchErrorKind::NotInitialized,
            format!("data source '{}' has not been initialized", source_name),
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::MalformedResponse, message)
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a host may reasonably retry the same call later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            FetchErrorKind::Timeout | FetchErrorKind::RateLimited | FetchErrorKind::Transport
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FetchErrorKind::Timeout
        } else if err.is_decode() {
            FetchErrorKind::MalformedResponse
        } else if let Some(status) = err.status() {
            FetchErrorKind::from_status(status.as_u16())
        } else {
            FetchErrorKind::Transport
        };
        Self::new(kind, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string()).with_source(err)
    }
}

impl FetchErrorKind {
    /// Map an HTTP status code to the closest kind
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::InvalidInput,
            401 | 403 => Self::Authentication,
            408 | 504 => Self::Timeout,
            429 => Self::RateLimited,
            // A bare 502/503 usually comes from a proxy; `NotInitialized`
            // is only trusted when the error body names it
            502 | 503 => Self::Transport,
            _ => Self::Other,
        }
    }

    /// HTTP status used when this kind crosses the wire
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::Authentication => 401,
            Self::RateLimited => 429,
            Self::NotInitialized => 503,
            Self::Timeout => 504,
            Self::Transport | Self::MalformedResponse => 502,
            Self::Other => 500,
        }
    }
}
