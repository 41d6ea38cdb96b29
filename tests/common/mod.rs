#![allow(dead_code)]

use async_trait::async_trait;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use topicsource::config::{Config, SourceConfig, SourceKind};
use topicsource::datasource::{
    Data, DataSource, FetchError, FetchErrorKind, InitializationError, NewQuestionInput, Topic,
};
use topicsource::server::{build_router, ServerState};

/// Seven topics mention entropy in the title, so a count of 5 has to truncate.
pub const CORPUS_YAML: &str = r#"
site: physics.example.org
topics:
  - topic_id: 1
    title: Entropy (thermodynamics)
    source_url: https://physics.example.org/q/1
    tags: [physics, thermodynamics]
    embedding: [1.0, 0.0, 0.0]
    data:
      - answer_id: 101
        text: Entropy is a measure of the number of microscopic configurations of a system.
      - answer_id: 102
        text: In classical thermodynamics entropy change is heat transferred divided by temperature.
        source_url: https://physics.example.org/a/102
  - topic_id: 2
    title: Information entropy and Shannon
    source_url: https://physics.example.org/q/2
    site: cs.example.org
    tags: [information-theory]
    embedding: [0.0, 1.0, 0.0]
    data:
      - answer_id: 201
        text: Shannon entropy is the expected information content of a message.
  - topic_id: 3
    title: Entropy and the second law
    source_url: https://physics.example.org/q/3
    tags: [physics]
    data:
      - answer_id: 301
        text: The entropy of an isolated system never decreases.
      - answer_id: 302
        text: ""
  - topic_id: 4
    title: Borrow checker rules
    source_url: https://rust.example.org/q/4
    tags: [rust]
  - topic_id: 5
    title: Entropy of black holes
    source_url: https://physics.example.org/q/5
    tags: [astrophysics]
  - topic_id: 6
    title: Entropy in statistical mechanics
    source_url: https://physics.example.org/q/6
    tags: [physics]
  - topic_id: 7
    title: Why does entropy increase
    source_url: https://physics.example.org/q/7
  - topic_id: 8
    title: Negative entropy in biology
    source_url: https://bio.example.org/q/8
    tags: [biology]
"#;

/// Write the shared corpus into `dir` and return its path
pub fn write_corpus(dir: &Path) -> PathBuf {
    let path = dir.join("corpus.yaml");
    std::fs::write(&path, CORPUS_YAML).unwrap();
    path
}

/// Config with a single static source named `name`
pub fn static_config(name: &str, corpus: &Path) -> Config {
    Config {
        sources: vec![SourceConfig {
            name: name.to_string(),
            kind: SourceKind::Static {
                path: corpus.to_path_buf(),
                require_text: true,
            },
            timeout_ms: None,
            enabled: true,
        }],
        ..Config::default()
    }
}

/// Serve `state` on an ephemeral local port
pub async fn spawn_server(state: ServerState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// `initialize` always fails; counts how often it was called
#[derive(Default)]
pub struct FailingInit {
    pub init_calls: AtomicUsize,
}

#[async_trait]
impl DataSource for FailingInit {
    fn name(&self) -> &str {
        "failing-init"
    }

    async fn initialize(&self) -> Result<(), InitializationError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        Err(InitializationError::missing_credentials("API token not provided"))
    }

    async fn check_availability(&self) -> bool {
        false
    }

    async fn fetch_topics(
        &self,
        _count: usize,
        _input: &NewQuestionInput,
    ) -> Result<Vec<Topic>, FetchError> {
        panic!("fetch_topics called on a failed source");
    }

    async fn fetch_data(&self, _count: usize, _topic_id: i64) -> Result<Vec<Data>, FetchError> {
        panic!("fetch_data called on a failed source");
    }
}

/// Initializes fine, then stalls or panics in every other operation
pub struct Misbehaving {
    pub delay: Duration,
}

#[async_trait]
impl DataSource for Misbehaving {
    fn name(&self) -> &str {
        "misbehaving"
    }

    async fn initialize(&self) -> Result<(), InitializationError> {
        Ok(())
    }

    async fn check_availability(&self) -> bool {
        panic!("probe blew up");
    }

    async fn fetch_topics(
        &self,
        _count: usize,
        _input: &NewQuestionInput,
    ) -> Result<Vec<Topic>, FetchError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![Topic::new(1, "late", "https://slow.example.org/1")])
    }

    async fn fetch_data(&self, _count: usize, _topic_id: i64) -> Result<Vec<Data>, FetchError> {
        panic!("fetch_data blew up");
    }
}

/// Fails the first `fetch_topics` with a transport error, then recovers
#[derive(Default)]
pub struct Flaky {
    pub calls: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

#[async_trait]
impl DataSource for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn initialize(&self) -> Result<(), InitializationError> {
        Ok(())
    }

    async fn check_availability(&self) -> bool {
        true
    }

    async fn fetch_topics(
        &self,
        count: usize,
        _input: &NewQuestionInput,
    ) -> Result<Vec<Topic>, FetchError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(FetchError::new(FetchErrorKind::Transport, "connection reset"));
        }
        Ok(vec![
            Topic::new(9, "recovered", "https://flaky.example.org/9"),
            Topic::new(10, "also recovered", "https://flaky.example.org/10"),
        ]
        .into_iter()
        .take(count)
        .collect())
    }

    async fn fetch_data(&self, _count: usize, _topic_id: i64) -> Result<Vec<Data>, FetchError> {
        Ok(vec![])
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Keeps every `NewQuestionInput` it is asked about
#[derive(Default)]
pub struct Recording {
    pub inputs: Mutex<Vec<NewQuestionInput>>,
}

impl Recording {
    pub fn received(&self) -> Vec<NewQuestionInput> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataSource for Recording {
    fn name(&self) -> &str {
        "recording"
    }

    async fn initialize(&self) -> Result<(), InitializationError> {
        Ok(())
    }

    async fn check_availability(&self) -> bool {
        true
    }

    async fn fetch_topics(
        &self,
        _count: usize,
        input: &NewQuestionInput,
    ) -> Result<Vec<Topic>, FetchError> {
        self.inputs.lock().unwrap().push(input.clone());
        Ok(vec![Topic::new(1, "seen", "https://recording.example.org/1")])
    }

    async fn fetch_data(&self, _count: usize, _topic_id: i64) -> Result<Vec<Data>, FetchError> {
        Ok(vec![])
    }
}
