// Registry error types

use crate::datasource::{FetchError, FetchErrorKind, InitializationError};
use crate::registry::SourceState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Data source not found: {0}")]
    NotFound(String),

    #[error("Data source already registered: {0}")]
    AlreadyExists(String),

    #[error("Data source '{name}' is not ready ({state})")]
    NotReady { name: String, state: SourceState },

    #[error("Data source '{name}' failed to initialize: {source}")]
    Initialization {
        name: String,
        #[source]
        source: InitializationError,
    },

    #[error("Data source '{name}' previously failed to initialize: {reason}")]
    Failed { name: String, reason: String },

    #[error("Fetch from '{name}' failed: {source}")]
    Fetch {
        name: String,
        #[source]
        source: FetchError,
    },
}

impl RegistryError {
    /// Kind of the underlying fetch failure, if this is one
    pub fn fetch_kind(&self) -> Option<FetchErrorKind> {
        match self {
            Self::Fetch { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
