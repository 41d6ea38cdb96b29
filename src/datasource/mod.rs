//! The data source contract.
//!
//! A [`DataSource`] supplies topics and the data attached to them to a host
//! search system. The host holds sources as `Arc<dyn DataSource>` and drives
//! them through a fixed lifecycle:
//!
//! 1. [`DataSource::initialize`] exactly once, before anything else.
//! 2. Any interleaving of [`DataSource::check_availability`],
//!    [`DataSource::fetch_topics`] and [`DataSource::fetch_data`], possibly
//!    concurrently on the same instance.
//! 3. [`DataSource::shutdown`] once the host is done with the instance.
//!
//! Dropping a returned future cancels the call; hosts bound calls with their
//! own deadline (see `registry`).
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use topicsource::datasource::{
//!     Data, DataSource, FetchError, InitializationError, NewQuestionInput, Topic,
//! };
//!
//! struct Fixed;
//!
//! #[async_trait]
//! impl DataSource for Fixed {
//!     fn name(&self) -> &str { "fixed" }
//!     async fn initialize(&self) -> Result<(), InitializationError> { Ok(()) }
//!     async fn check_availability(&self) -> bool { true }
//!     async fn fetch_topics(
//!         &self,
//!         count: usize,
//!         _input: &NewQuestionInput,
//!     ) -> Result<Vec<Topic>, FetchError> {
//!         let topics = vec![Topic::new(1, "Entropy", "https://example.org/entropy")];
//!         Ok(topics.into_iter().take(count).collect())
//!     }
//!     async fn fetch_data(&self, count: usize, topic_id: i64) -> Result<Vec<Data>, FetchError> {
//!         if topic_id != 1 {
//!             return Ok(vec![]);
//!         }
//!         let url = "https://example.org/entropy#10";
//!         let data = vec![Data::new(10, "A measure of disorder.", url)];
//!         Ok(data.into_iter().take(count).collect())
//!     }
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{FetchError, FetchErrorKind, InitializationError, InitializationErrorKind};
pub use types::{Data, NewQuestionInput, Topic};

use async_trait::async_trait;

/// Capability set every integration implements
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Prepare the instance (configuration, credentials, connections).
    ///
    /// Called at most once and before any other method. Other methods called
    /// before a successful `initialize` must report `NotInitialized` / `false`.
    async fn initialize(&self) -> Result<(), InitializationError>;

    /// Fast liveness probe. Never fails: unavailability is `false`.
    async fn check_availability(&self) -> bool;

    /// At most `count` topics relevant to `input`, most relevant first.
    ///
    /// No results is `Ok(vec![])`. `count == 0` always yields `Ok(vec![])`.
    async fn fetch_topics(
        &self,
        count: usize,
        input: &NewQuestionInput,
    ) -> Result<Vec<Topic>, FetchError>;

    /// At most `count` records for a topic previously returned by this instance.
    ///
    /// An unknown `topic_id` yields `Ok(vec![])`.
    async fn fetch_data(&self, count: usize, topic_id: i64) -> Result<Vec<Data>, FetchError>;

    /// Release connections and other resources held by the instance.
    async fn shutdown(&self) {}
}
