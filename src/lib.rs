// Topicsource - data source plugin contract and host-side tooling

pub mod cli;
pub mod config;
pub mod datasource;
pub mod formatter;
pub mod observability;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod sources;

pub use datasource::{
    Data, DataSource, FetchError, FetchErrorKind, InitializationError, InitializationErrorKind,
    NewQuestionInput, Topic,
};
pub use registry::{SourceRegistry, SourceState};
