use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Where the DevTools-enabled browser listens and how patient the
/// protocol client is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevtoolsConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Wall-clock timeout for each receive attempt, in seconds.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// How many non-matching frames a command will discard before
    /// giving up.
    #[serde(default = "default_max_discarded_frames")]
    pub max_discarded_frames: usize,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9222
}

fn default_command_timeout_secs() -> u64 {
    10
}

fn default_max_discarded_frames() -> usize {
    100
}

impl Default for DevtoolsConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            command_timeout_secs: default_command_timeout_secs(),
            max_discarded_frames: default_max_discarded_frames(),
        }
    }
}

impl DevtoolsConfig {
    pub fn discovery_url(&self) -> String {
        format!("http://{}:{}/json", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchConfig {
    /// Cache TTL for extracted page content, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Maximum number of sources pulled into one report.
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_max_sources() -> usize {
    5
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            max_sources: default_max_sources(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub devtools: DevtoolsConfig,
    #[serde(default)]
    pub research: ResearchConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load from the given path, or from the default location, falling
    /// back to defaults when no file exists.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tabscout")
            .join("config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.devtools.host, "localhost");
        assert_eq!(cfg.devtools.port, 9222);
        assert_eq!(cfg.devtools.command_timeout_secs, 10);
        assert_eq!(cfg.devtools.max_discarded_frames, 100);
        assert_eq!(cfg.research.cache_ttl_secs, 300);
        assert_eq!(cfg.research.max_sources, 5);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"{"devtools": {"port": 9333}}"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(cfg.devtools.port, 9333);
        assert_eq!(cfg.devtools.host, "localhost");
        assert_eq!(cfg.research.max_sources, 5);
    }

    #[test]
    fn test_discovery_url() {
        let cfg = DevtoolsConfig::default();
        assert_eq!(cfg.discovery_url(), "http://localhost:9222/json");
    }
}
