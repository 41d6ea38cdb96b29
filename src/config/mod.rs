use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use std::time::Duration;
use anyhow::Context;
use log::info;

const DEFAULT_CONFIG_PATH: &str = "~/.config/topicsource/sources.yaml";
const CONFIG_ENV: &str = "TOPICSOURCE_CONFIG";
const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Source kind with kind-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Corpus file on local disk
    Static {
        path: PathBuf,
        #[serde(default = "default_true")]
        require_text: bool,
    },
    /// Data source served by another process over HTTP
    Remote {
        url: String,
        #[serde(default)]
        api_key_env: Option<String>,
    },
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Static { .. } => "static",
            Self::Remote { .. } => "remote",
        }
    }
}

/// A single configured data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(flatten)]
    pub kind: SourceKind,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// HTTP serving defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Env var holding the API key clients must send
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key_env: None,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Per-call deadline for sources without their own `timeout_ms`
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from `$TOPICSOURCE_CONFIG`, the default path, or defaults
    pub fn load() -> Result<Self, anyhow::Error> {
        let config_path = match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => expand_path(&path),
            _ => expand_path(DEFAULT_CONFIG_PATH),
        };

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("Configuration not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, anyhow::Error> {
        info!("Loading configuration from: {:?}", path);
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        for source in &mut config.sources {
            if let SourceKind::Static { path, .. } = &mut source.kind {
                *path = expand_path(&path.to_string_lossy());
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), anyhow::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;

        info!("Configuration saved to: {:?}", path);
        Ok(())
    }

    /// Reject duplicate or empty source names
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                anyhow::bail!("Source name must not be empty");
            }
            if !seen.insert(source.name.as_str()) {
                anyhow::bail!("Duplicate source name: {}", source.name);
            }
        }
        Ok(())
    }

    /// Sources with `enabled: true`, in file order
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Deadline for calls into `source`
    pub fn timeout_for(&self, source: &SourceConfig) -> Duration {
        Duration::from_millis(source.timeout_ms.unwrap_or(self.default_timeout_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            server: ServerSection::default(),
            sources: Vec::new(),
        }
    }
}

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_for_falls_back_to_default() {
        let config = Config::default();
        let source = SourceConfig {
            name: "demo".to_string(),
            kind: SourceKind::Remote { url: "http://localhost:1".to_string(), api_key_env: None },
            timeout_ms: None,
            enabled: true,
        };
        assert_eq!(config.timeout_for(&source), Duration::from_millis(5000));

        let source = SourceConfig { timeout_ms: Some(250), ..source };
        assert_eq!(config.timeout_for(&source), Duration::from_millis(250));
    }

    #[test]
    fn test_expand_path_tilde() {
        let path = expand_path("~/corpus.yaml");
        assert!(!path.to_string_lossy().starts_with('~'));
    }
}
