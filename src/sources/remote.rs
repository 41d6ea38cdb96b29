//! HTTP client for a data source living in another process.
//!
//! Speaks the JSON protocol in [`crate::protocol`]; any process running
//! `topicsource serve` (or anything else implementing the same endpoints) can
//! be plugged in as a source.

use crate::datasource::{
    Data, DataSource, FetchError, FetchErrorKind, InitializationError, NewQuestionInput, Topic,
};
use crate::protocol::{
    DataRequest, DataResponse, ErrorBody, HealthResponse, TopicsRequest, TopicsResponse,
    API_KEY_HEADER, DATA_PATH, HEALTH_PATH, TOPICS_PATH,
};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::RwLock;

/// Client state created by `initialize`
#[derive(Clone)]
struct Connection {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl Connection {
    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| FetchError::new(FetchErrorKind::Other, e.to_string()).with_source(e))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }
}

/// Data source backed by a remote HTTP endpoint
pub struct RemoteSource {
    name: String,
    url: String,
    api_key_env: Option<String>,
    timeout: Duration,
    connection: RwLock<Option<Connection>>,
}

impl RemoteSource {
    /// Create a remote source
    ///
    /// # Arguments
    /// * `name` - Name used in logs and by the registry
    /// * `url` - Base URL of the serving process (e.g. "http://127.0.0.1:8080")
    /// * `timeout` - Deadline applied to every HTTP call
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            api_key_env: None,
            timeout,
            connection: RwLock::new(None),
        }
    }

    /// Read the API key from this environment variable during `initialize`
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }

    async fn connection(&self) -> Result<Connection, FetchError> {
        self.connection
            .read()
            .await
            .clone()
            .ok_or_else(|| FetchError::not_initialized(&self.name))
    }

    fn base_url(&self) -> Result<Url, InitializationError> {
        // Url::join drops the last path segment unless it ends with '/'
        let mut raw = self.url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).map_err(|e| {
            InitializationError::invalid_configuration(format!("invalid url '{}': {}", self.url, e))
                .with_source(e)
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(InitializationError::invalid_configuration(format!(
                "unsupported scheme '{}' in '{}'",
                base.scheme(),
                self.url
            )));
        }
        Ok(base)
    }

    fn api_key(&self) -> Result<Option<String>, InitializationError> {
        let Some(var) = &self.api_key_env else {
            return Ok(None);
        };
        match std::env::var(var) {
            Ok(key) if !key.is_empty() => Ok(Some(key)),
            _ => Err(InitializationError::missing_credentials(format!(
                "environment variable {} is not set",
                var
            ))),
        }
    }

    /// Turn a response into `T`, or into the error the server described
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FetchError> {
        let status = response.status();
        let url = response.url().clone();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(match serde_json::from_slice::<ErrorBody>(&body) {
                Ok(error) => error.into(),
                Err(_) => FetchError::new(
                    FetchErrorKind::from_status(status.as_u16()),
                    format!("HTTP {} from {}", status, url),
                ),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl DataSource for RemoteSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), InitializationError> {
        let mut slot = self.connection.write().await;
        if slot.is_some() {
            return Ok(());
        }

        let api_key = self.api_key()?;
        let base = self.base_url()?;
        let client = Client::builder().timeout(self.timeout).build().map_err(|e| {
            InitializationError::invalid_configuration("failed to build HTTP client").with_source(e)
        })?;
        let connection = Connection { client, base, api_key };

        let health = connection
            .endpoint(HEALTH_PATH)
            .map_err(|e| InitializationError::invalid_configuration(e.to_string()))?;
        let response = connection
            .authorize(connection.client.get(health.clone()))
            .send()
            .await
            .map_err(|e| {
                InitializationError::unreachable(format!("{} did not respond", health))
                    .with_source(e)
            })?;

        match response.status().as_u16() {
            401 | 403 => {
                return Err(InitializationError::missing_credentials(format!(
                    "{} rejected the API key",
                    health
                )))
            }
            code if !(200..300).contains(&code) => {
                return Err(InitializationError::unreachable(format!(
                    "{} answered HTTP {}",
                    health, code
                )))
            }
            _ => {}
        }

        info!("Source '{}' connected to {}", self.name, connection.base);
        *slot = Some(connection);
        Ok(())
    }

    async fn check_availability(&self) -> bool {
        let Ok(connection) = self.connection().await else {
            return false;
        };
        let Ok(url) = connection.endpoint(HEALTH_PATH) else {
            return false;
        };

        match connection.authorize(connection.client.get(url)).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<HealthResponse>().await {
                    Ok(health) => health.available,
                    Err(e) => {
                        warn!("Source '{}' sent an unreadable health body: {}", self.name, e);
                        false
                    }
                }
            }
            Ok(response) => {
                debug!("Source '{}' health returned {}", self.name, response.status());
                false
            }
            Err(e) => {
                debug!("Source '{}' health probe failed: {}", self.name, e);
                false
            }
        }
    }

    async fn fetch_topics(
        &self,
        count: usize,
        input: &NewQuestionInput,
    ) -> Result<Vec<Topic>, FetchError> {
        if count == 0 {
            return Ok(vec![]);
        }
        let connection = self.connection().await?;
        let url = connection.endpoint(TOPICS_PATH)?;
        let request = TopicsRequest {
            count,
            input: input.clone(),
        };

        let response = connection
            .authorize(connection.client.post(url))
            .json(&request)
            .send()
            .await?;
        let mut topics = Self::decode::<TopicsResponse>(response).await?.topics;
        topics.truncate(count);
        Ok(topics)
    }

    async fn fetch_data(&self, count: usize, topic_id: i64) -> Result<Vec<Data>, FetchError> {
        if count == 0 {
            return Ok(vec![]);
        }
        let connection = self.connection().await?;
        let url = connection.endpoint(DATA_PATH)?;

        let response = connection
            .authorize(connection.client.post(url))
            .json(&DataRequest { count, topic_id })
            .send()
            .await?;
        let mut data = Self::decode::<DataResponse>(response).await?.data;
        data.retain(|d| !d.text.trim().is_empty());
        data.truncate(count);
        Ok(data)
    }

    async fn shutdown(&self) {
        if self.connection.write().await.take().is_some() {
            debug!("Source '{}' closed its HTTP client", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::InitializationErrorKind;

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let source =
            RemoteSource::new("r", "http://localhost:9000/plugins/wiki", Duration::from_secs(1));
        let base = source.base_url().unwrap();
        let conn = Connection {
            client: Client::new(),
            base,
            api_key: None,
        };
        assert_eq!(
            conn.endpoint(TOPICS_PATH).unwrap().as_str(),
            "http://localhost:9000/plugins/wiki/v1/topics"
        );
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let source = RemoteSource::new("r", "ftp://example.org", Duration::from_secs(1));
        let err = source.base_url().unwrap_err();
        assert_eq!(err.kind(), InitializationErrorKind::InvalidConfiguration);
    }

    #[tokio::test]
    async fn test_missing_api_key_env() {
        let source = RemoteSource::new("r", "http://127.0.0.1:9", Duration::from_secs(1))
            .with_api_key_env("TOPICSOURCE_TEST_KEY_THAT_IS_NOT_SET");
        let err = source.initialize().await.unwrap_err();
        assert_eq!(err.kind(), InitializationErrorKind::MissingCredentials);
    }

    #[tokio::test]
    async fn test_uninitialized_is_unavailable() {
        let source = RemoteSource::new("r", "http://127.0.0.1:9", Duration::from_secs(1));
        assert!(!source.check_availability().await);
        let err = source.fetch_data(3, 1).await.unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::NotInitialized);
    }

    #[tokio::test]
    async fn test_zero_count_short_circuits() {
        let source = RemoteSource::new("r", "http://127.0.0.1:9", Duration::from_secs(1));
        let topics = source
            .fetch_topics(0, &NewQuestionInput::new("anything"))
            .await
            .unwrap();
        assert!(topics.is_empty());
    }
}
