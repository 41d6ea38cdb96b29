// HTTP server module
// Serves a single data source over the JSON protocol in `crate::protocol`

pub mod handlers;
pub mod middleware;

use crate::config::ServerSection;
use crate::datasource::DataSource;
use crate::observability::Metrics;
use crate::protocol::{DATA_PATH, HEALTH_PATH, TOPICS_PATH};
use anyhow::{Context, Result};
use axum::Router as AxumRouter;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Server state shared by all handlers
#[derive(Clone)]
pub struct ServerState {
    pub source: Arc<dyn DataSource>,
    pub metrics: Arc<Metrics>,
    pub api_key: Option<Arc<str>>,
    /// Deadline for every call into the source
    pub timeout: Duration,
}

impl ServerState {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            metrics: Arc::new(Metrics::new()),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Require clients to send this key in `X-API-Key`
    pub fn with_api_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Resolve the config file section, reading the API key from its env var
    pub fn from_section(section: &ServerSection) -> Result<Self> {
        let api_key = match &section.api_key_env {
            Some(var) => Some(
                std::env::var(var)
                    .with_context(|| format!("Server API key variable {} is not set", var))?,
            ),
            None => None,
        };
        Ok(Self {
            host: section.host.clone(),
            port: section.port,
            api_key,
            timeout: DEFAULT_TIMEOUT,
        })
    }
}

/// Initialize logging for the server.
///
/// Installs a tracing subscriber and bridges `log` records into it, so the
/// binary must not install another `log` logger before calling this.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "topicsource=debug,tower_http=warn,axum=warn".into());

    // Fails only when a subscriber or logger is already installed; keep that one
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Build the router with all endpoints
pub fn build_router(state: ServerState) -> AxumRouter {
    use axum::routing::{get, post};
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = AxumRouter::new()
        .route(TOPICS_PATH, post(handlers::topics))
        .route(DATA_PATH, post(handlers::data))
        .route("/metrics", get(handlers::metrics))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ));

    AxumRouter::new()
        .route(HEALTH_PATH, get(handlers::health))
        .merge(protected)
        .layer(axum::middleware::from_fn(middleware::trace_request_mw))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Initialize `source`, serve it until ctrl-c, then shut it down
pub async fn run(source: Arc<dyn DataSource>, config: &ServerConfig) -> Result<()> {
    source
        .initialize()
        .await
        .with_context(|| format!("Failed to initialize data source '{}'", source.name()))?;

    let mut state = ServerState::new(source.clone()).with_timeout(config.timeout);
    if let Some(key) = &config.api_key {
        state = state.with_api_key(key.as_str());
    }
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Serving data source '{}' on http://{}", source.name(), addr);
    tracing::info!("  GET  {}      - Availability", HEALTH_PATH);
    tracing::info!("  POST {}   - Fetch topics", TOPICS_PATH);
    tracing::info!("  POST {}     - Fetch data", DATA_PATH);
    tracing::info!("  GET  /metrics     - Counters");
    if config.api_key.is_some() {
        tracing::info!("  Auth: API Key required (X-API-Key header)");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    source.shutdown().await;
    tracing::info!("Data source '{}' shut down", source.name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{Corpus, CorpusEntry, CorpusTopic, StaticSource};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn state() -> ServerState {
        let corpus = Corpus {
            site: String::new(),
            topics: vec![CorpusTopic {
                topic_id: 5,
                title: "Borrow checker".to_string(),
                source_url: "https://example.org/borrowck".to_string(),
                site: String::new(),
                tags: vec!["rust".to_string()],
                embedding: None,
                data: vec![CorpusEntry {
                    answer_id: 50,
                    text: "References must not outlive their referent.".to_string(),
                    source_url: None,
                    site: String::new(),
                }],
            }],
        };
        let source = StaticSource::from_corpus("borrowck", corpus);
        source.initialize().await.unwrap();
        ServerState::new(Arc::new(source))
    }

    fn post_json(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.api_key.is_none());
    }

    #[tokio::test]
    async fn test_health_reports_availability_and_request_id() {
        let app = build_router(state().await);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["available"], true);
        assert_eq!(json["source"], "borrowck");
    }

    #[tokio::test]
    async fn test_topics_endpoint() {
        let app = build_router(state().await);
        let response = app
            .oneshot(post_json(
                "/v1/topics",
                r#"{"count": 2, "input": {"questionText": "borrow checker rules"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["topics"][0]["topicID"], 5);
    }

    #[tokio::test]
    async fn test_invalid_input_maps_to_400() {
        let app = build_router(state().await);
        let response = app
            .oneshot(post_json("/v1/topics", r#"{"count": 2, "input": {"questionText": ""}}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["kind"], "invalid_input");
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let app = build_router(state().await.with_api_key("secret"));

        let denied = app
            .clone()
            .oneshot(post_json("/v1/data", r#"{"count": 1, "topicID": 5}"#))
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let mut request = post_json("/v1/data", r#"{"count": 1, "topicID": 5}"#);
        request.headers_mut().insert("x-api-key", "secret".parse().unwrap());
        let allowed = app.oneshot(request).await.unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    /// Panics on topics, stalls on data
    struct Broken;

    #[async_trait::async_trait]
    impl DataSource for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn initialize(&self) -> Result<(), crate::datasource::InitializationError> {
            Ok(())
        }

        async fn check_availability(&self) -> bool {
            tokio::time::sleep(Duration::from_secs(5)).await;
            true
        }

        async fn fetch_topics(
            &self,
            _count: usize,
            _input: &crate::datasource::NewQuestionInput,
        ) -> Result<Vec<crate::datasource::Topic>, crate::datasource::FetchError> {
            panic!("index corrupted");
        }

        async fn fetch_data(
            &self,
            _count: usize,
            _topic_id: i64,
        ) -> Result<Vec<crate::datasource::Data>, crate::datasource::FetchError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        }
    }

    async fn error_kind(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["error"]["kind"].clone()
    }

    #[tokio::test]
    async fn test_panicking_source_returns_error_body() {
        let state = ServerState::new(Arc::new(Broken));
        let metrics = state.metrics.clone();
        let app = build_router(state);

        let response = app
            .oneshot(post_json("/v1/topics", r#"{"count": 1, "input": {"questionText": "q"}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error_kind(response).await, "other");
        assert_eq!(metrics.snapshot().errors_total, 1);
    }

    #[tokio::test]
    async fn test_stalled_source_times_out() {
        let state = ServerState::new(Arc::new(Broken)).with_timeout(Duration::from_millis(50));
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json("/v1/data", r#"{"count": 1, "topicID": 1}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(error_kind(response).await, "timeout");

        let health = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(health.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["available"], false);
    }

    #[test]
    fn test_init_logging_twice_keeps_first_subscriber() {
        init_logging();
        init_logging();
        assert!(tracing::dispatcher::has_been_set());
    }
}
