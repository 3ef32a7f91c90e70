//! Configuration loader and validator for the catalog batch client.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::GRAPH_API_BASE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub catalog: CatalogConfig,
}

/// Target catalog and transport settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_version: String,
    pub catalog_id: u64,
    /// Used by the binary when no token is supplied through the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Per-call timeout; unset means the call waits on the executor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

fn default_base_url() -> String {
    GRAPH_API_BASE.to_string()
}

impl CatalogConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let c = &cfg.catalog;
    if c.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("catalog.base_url must be non-empty"));
    }
    if c.api_version.trim().is_empty() {
        return Err(ConfigError::Invalid("catalog.api_version must be non-empty"));
    }
    if c.catalog_id == 0 {
        return Err(ConfigError::Invalid("catalog.catalog_id must be > 0"));
    }
    if matches!(c.access_token.as_deref(), Some(t) if t.trim().is_empty()) {
        return Err(ConfigError::Invalid(
            "catalog.access_token must be non-empty when set",
        ));
    }
    if c.timeout_ms == Some(0) {
        return Err(ConfigError::Invalid("catalog.timeout_ms must be > 0"));
    }
    Ok(())
}

/// Example YAML content.
pub fn example() -> &'static str {
    r#"catalog:
  base_url: "https://graph.facebook.com"
  api_version: "v19.0"
  catalog_id: 123456
  access_token: "YOUR_CATALOG_ACCESS_TOKEN"
  timeout_ms: 30000
"#
}
