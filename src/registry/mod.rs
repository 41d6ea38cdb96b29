// Source registry - host-side owner of data sources
// Drives the initialize / fetch / shutdown lifecycle and bounds every call with a deadline

pub mod error;

pub use error::{RegistryError, Result};

use crate::datasource::{
    Data, DataSource, FetchError, FetchErrorKind, InitializationError, NewQuestionInput, Topic,
};
use crate::observability::Metrics;
use futures::future::join_all;
use futures::FutureExt;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::Mutex;

/// Lifecycle state of a registered source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    /// Registered, `initialize` not called yet
    Registered,
    Ready,
    /// `initialize` failed; the source is never called again
    Failed(String),
    /// Shut down by the registry
    Closed,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => f.write_str("registered"),
            Self::Ready => f.write_str("ready"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// Source information
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub name: String,
    pub state: SourceState,
    pub timeout_ms: u64,
}

/// Topics returned by one source during a fan-out
#[derive(Debug)]
pub struct SourceTopics {
    pub source: String,
    pub result: Result<Vec<Topic>>,
}

struct Entry {
    source: Arc<dyn DataSource>,
    state: SourceState,
    timeout: Duration,
    /// Serializes `initialize` so it runs at most once
    init_gate: Arc<Mutex<()>>,
}

/// Registry of data sources keyed by name
pub struct SourceRegistry {
    entries: RwLock<HashMap<String, Entry>>,
    default_timeout: Duration,
    metrics: Arc<Metrics>,
}

/// Run a source call under a deadline, turning panics into errors
pub(crate) async fn guarded<T, F>(timeout: Duration, call: F) -> std::result::Result<T, FetchError>
where
    F: Future<Output = std::result::Result<T, FetchError>>,
{
    match tokio::time::timeout(timeout, AssertUnwindSafe(call).catch_unwind()).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(FetchError::new(FetchErrorKind::Other, "data source panicked")),
        Err(_) => Err(FetchError::timeout(format!(
            "no response within {}ms",
            timeout.as_millis()
        ))),
    }
}

impl SourceRegistry {
    /// Create an empty registry; `default_timeout` bounds every source call
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_timeout,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Share an existing metrics collector
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a source with the default timeout
    pub fn register(&self, name: &str, source: Arc<dyn DataSource>) -> Result<()> {
        self.register_with_timeout(name, source, self.default_timeout)
    }

    /// Register a source with its own timeout
    pub fn register_with_timeout(
        &self,
        name: &str,
        source: Arc<dyn DataSource>,
        timeout: Duration,
    ) -> Result<()> {
        let mut entries = self.write();
        if entries.contains_key(name) {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }

        entries.insert(
            name.to_string(),
            Entry {
                source,
                state: SourceState::Registered,
                timeout,
                init_gate: Arc::new(Mutex::new(())),
            },
        );
        debug!("Registered data source: {}", name);
        Ok(())
    }

    /// List all sources, sorted by name
    pub fn list(&self) -> Vec<SourceInfo> {
        let mut infos: Vec<SourceInfo> = self
            .read()
            .iter()
            .map(|(name, entry)| SourceInfo {
                name: name.clone(),
                state: entry.state.clone(),
                timeout_ms: entry.timeout.as_millis() as u64,
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn state(&self, name: &str) -> Option<SourceState> {
        self.read().get(name).map(|entry| entry.state.clone())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        self.read().get(name).map(|entry| entry.source.clone())
    }

    fn names_in(&self, state: &SourceState) -> Vec<String> {
        let mut names: Vec<String> = self
            .read()
            .iter()
            .filter(|(_, entry)| &entry.state == state)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn set_state(&self, name: &str, state: SourceState) {
        if let Some(entry) = self.write().get_mut(name) {
            entry.state = state;
        }
    }

    /// Source and timeout of a `Ready` source
    fn ready(&self, name: &str) -> Result<(Arc<dyn DataSource>, Duration)> {
        let entries = self.read();
        let entry = entries
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        match entry.state {
            SourceState::Ready => Ok((entry.source.clone(), entry.timeout)),
            ref state => Err(RegistryError::NotReady {
                name: name.to_string(),
                state: state.clone(),
            }),
        }
    }

    /// Initialize a source. Runs `DataSource::initialize` at most once per source.
    pub async fn initialize(&self, name: &str) -> Result<()> {
        let (source, timeout, gate) = {
            let entries = self.read();
            let entry = entries
                .get(name)
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
            (entry.source.clone(), entry.timeout, entry.init_gate.clone())
        };

        let _gate = gate.lock().await;
        match self.state(name) {
            Some(SourceState::Registered) => {}
            Some(SourceState::Ready) => return Ok(()),
            Some(SourceState::Failed(reason)) => {
                return Err(RegistryError::Failed {
                    name: name.to_string(),
                    reason,
                })
            }
            Some(state) => {
                return Err(RegistryError::NotReady {
                    name: name.to_string(),
                    state,
                })
            }
            None => return Err(RegistryError::NotFound(name.to_string())),
        }

        let init = AssertUnwindSafe(source.initialize()).catch_unwind();
        let outcome = match tokio::time::timeout(timeout, init).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(InitializationError::invalid_configuration("initialize panicked")),
            Err(_) => Err(InitializationError::unreachable(format!(
                "initialize did not finish within {}ms",
                timeout.as_millis()
            ))),
        };

        match outcome {
            Ok(()) => {
                self.set_state(name, SourceState::Ready);
                info!("Data source '{}' initialized", name);
                Ok(())
            }
            Err(e) => {
                self.set_state(name, SourceState::Failed(e.to_string()));
                self.metrics.inc_init_failures();
                warn!("Data source '{}' failed to initialize: {}", name, e);
                Err(RegistryError::Initialization {
                    name: name.to_string(),
                    source: e,
                })
            }
        }
    }

    /// Initialize every registered source concurrently
    pub async fn initialize_all(&self) -> Vec<(String, Result<()>)> {
        let names = self.names_in(&SourceState::Registered);
        let results = join_all(names.iter().map(|name| self.initialize(name))).await;
        names.into_iter().zip(results).collect()
    }

    /// Liveness of a ready source. Never fails: timeouts, panics and
    /// non-ready sources all report `false`.
    pub async fn check_availability(&self, name: &str) -> bool {
        let Ok((source, timeout)) = self.ready(name) else {
            return false;
        };
        self.metrics.inc_availability_checks();

        let probe = AssertUnwindSafe(source.check_availability()).catch_unwind();
        match tokio::time::timeout(timeout, probe).await {
            Ok(Ok(available)) => available,
            Ok(Err(_)) => {
                warn!("Data source '{}' panicked in check_availability", name);
                false
            }
            Err(_) => {
                warn!("Data source '{}' availability probe timed out", name);
                false
            }
        }
    }

    /// Availability of every source, sorted by name
    pub async fn check_all(&self) -> Vec<(String, bool)> {
        let names: Vec<String> = self.list().into_iter().map(|info| info.name).collect();
        let results = join_all(names.iter().map(|name| self.check_availability(name))).await;
        names.into_iter().zip(results).collect()
    }

    fn fetch_failed(&self, name: &str, err: FetchError) -> RegistryError {
        self.metrics.record_error(err.kind());
        warn!("Fetch from '{}' failed: {}", name, err);
        RegistryError::Fetch {
            name: name.to_string(),
            source: err,
        }
    }

    /// Topics from one source, at most `count`
    pub async fn fetch_topics(
        &self,
        name: &str,
        count: usize,
        input: &NewQuestionInput,
    ) -> Result<Vec<Topic>> {
        let (source, timeout) = self.ready(name)?;
        self.metrics.inc_topics();

        match guarded(timeout, source.fetch_topics(count, input)).await {
            Ok(mut topics) => {
                topics.truncate(count);
                debug!("Source '{}' returned {} topics", name, topics.len());
                Ok(topics)
            }
            Err(e) => Err(self.fetch_failed(name, e)),
        }
    }

    /// Data for a topic from one source, at most `count`
    pub async fn fetch_data(&self, name: &str, count: usize, topic_id: i64) -> Result<Vec<Data>> {
        let (source, timeout) = self.ready(name)?;
        self.metrics.inc_data();

        match guarded(timeout, source.fetch_data(count, topic_id)).await {
            Ok(mut data) => {
                data.truncate(count);
                debug!("Source '{}' returned {} records for topic {}", name, data.len(), topic_id);
                Ok(data)
            }
            Err(e) => Err(self.fetch_failed(name, e)),
        }
    }

    /// Query every ready source concurrently; one entry per source, sorted by name
    pub async fn fetch_topics_all(
        &self,
        count: usize,
        input: &NewQuestionInput,
    ) -> Vec<SourceTopics> {
        let names = self.names_in(&SourceState::Ready);
        let calls = names.iter().map(|name| self.fetch_topics(name, count, input));
        let results = join_all(calls).await;
        names
            .into_iter()
            .zip(results)
            .map(|(source, result)| SourceTopics { source, result })
            .collect()
    }

    async fn close_all(&self) {
        let open: Vec<(String, Arc<dyn DataSource>, Duration)> = {
            let mut entries = self.write();
            entries
                .iter_mut()
                .filter(|(_, entry)| entry.state == SourceState::Ready)
                .map(|(name, entry)| {
                    entry.state = SourceState::Closed;
                    (name.clone(), entry.source.clone(), entry.timeout)
                })
                .collect()
        };

        join_all(open.into_iter().map(|(name, source, timeout)| async move {
            if tokio::time::timeout(timeout, source.shutdown()).await.is_err() {
                warn!("Data source '{}' did not shut down within {}ms", name, timeout.as_millis());
            } else {
                debug!("Data source '{}' shut down", name);
            }
        }))
        .await;
    }

    /// Shut down every initialized source and release the registry
    pub async fn shutdown(self) {
        self.close_all().await;
        info!("Source registry shut down");
    }
}

impl Drop for SourceRegistry {
    fn drop(&mut self) {
        let entries = self.entries.get_mut().unwrap_or_else(PoisonError::into_inner);
        let open: Vec<(String, Arc<dyn DataSource>)> = entries
            .iter_mut()
            .filter(|(_, entry)| entry.state == SourceState::Ready)
            .map(|(name, entry)| {
                entry.state = SourceState::Closed;
                (name.clone(), entry.source.clone())
            })
            .collect();

        if open.is_empty() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                for (name, source) in open {
                    handle.spawn(async move {
                        source.shutdown().await;
                        debug!("Data source '{}' shut down on drop", name);
                    });
                }
            }
            Err(_) => warn!(
                "Source registry dropped outside a runtime; {} sources were not shut down",
                open.len()
            ),
        }
    }
}
