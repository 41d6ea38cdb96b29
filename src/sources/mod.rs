//! Built-in data sources + construction from configuration.

pub mod remote;
pub mod static_source;

pub use remote::RemoteSource;
pub use static_source::{Corpus, CorpusEntry, CorpusTopic, StaticSource};

use crate::config::{Config, SourceConfig, SourceKind};
use crate::datasource::DataSource;
use crate::registry::{RegistryError, SourceRegistry};
use std::sync::Arc;
use std::time::Duration;

/// Build the data source described by one config entry
pub fn build(source: &SourceConfig, timeout: Duration) -> Arc<dyn DataSource> {
    match &source.kind {
        SourceKind::Static { path, require_text } => Arc::new(
            StaticSource::new(source.name.clone(), path.clone()).require_text(*require_text),
        ),
        SourceKind::Remote { url, api_key_env } => {
            let remote = RemoteSource::new(source.name.clone(), url.clone(), timeout);
            match api_key_env {
                Some(var) => Arc::new(remote.with_api_key_env(var.clone())),
                None => Arc::new(remote),
            }
        }
    }
}

/// Registry holding every enabled source from `config`, not yet initialized
pub fn registry_from_config(config: &Config) -> Result<SourceRegistry, RegistryError> {
    let registry = SourceRegistry::new(Duration::from_millis(config.default_timeout_ms));
    for source in config.enabled_sources() {
        let timeout = config.timeout_for(source);
        registry.register_with_timeout(&source.name, build(source, timeout), timeout)?;
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_from_config_skips_disabled() {
        let config = Config {
            sources: vec![
                SourceConfig {
                    name: "local".to_string(),
                    kind: SourceKind::Static {
                        path: "/tmp/corpus.yaml".into(),
                        require_text: true,
                    },
                    timeout_ms: None,
                    enabled: true,
                },
                SourceConfig {
                    name: "off".to_string(),
                    kind: SourceKind::Remote {
                        url: "http://127.0.0.1:1".to_string(),
                        api_key_env: None,
                    },
                    timeout_ms: Some(100),
                    enabled: false,
                },
            ],
            ..Config::default()
        };

        let registry = registry_from_config(&config).unwrap();
        let names: Vec<String> = registry.list().into_iter().map(|info| info.name).collect();
        assert_eq!(names, vec!["local".to_string()]);
    }
}
