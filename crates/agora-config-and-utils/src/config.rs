//! Configuration management for the client core.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default API base URL (can be overridden at compile time via AGORA_API_URL env var).
pub const DEFAULT_API_URL: &str = match option_env!("AGORA_API_URL") {
    Some(url) => url,
    None => "https://api.agora-debates.app/api/",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TRANSIENT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_TRANSIENT_RETRY_INTERVAL_MS: u64 = 1000;
const DEFAULT_CONNECTIVITY_PROMPT_TIMEOUT_SECS: u64 = 10;

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL every endpoint path is joined onto. Must end with `/`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request transport timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How many times a 408/502/503/504 response is retried.
    #[serde(default = "default_transient_retry_attempts")]
    pub transient_retry_attempts: u32,
    /// Constant sleep between transient retries.
    #[serde(default = "default_transient_retry_interval_ms")]
    pub transient_retry_interval_ms: u64,
    /// How long a connectivity banner waits for the user before giving up.
    #[serde(default = "default_connectivity_prompt_timeout_secs")]
    pub connectivity_prompt_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_transient_retry_attempts() -> u32 {
    DEFAULT_TRANSIENT_RETRY_ATTEMPTS
}

fn default_transient_retry_interval_ms() -> u64 {
    DEFAULT_TRANSIENT_RETRY_INTERVAL_MS
}

fn default_connectivity_prompt_timeout_secs() -> u64 {
    DEFAULT_CONNECTIVITY_PROMPT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            transient_retry_attempts: DEFAULT_TRANSIENT_RETRY_ATTEMPTS,
            transient_retry_interval_ms: DEFAULT_TRANSIENT_RETRY_INTERVAL_MS,
            connectivity_prompt_timeout_secs: DEFAULT_CONNECTIVITY_PROMPT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("AGORA_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(url) = std::env::var("AGORA_API_URL") {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
    }

    fn validate(&self) -> CoreResult<()> {
        let url = self.api_base_url()?;
        if !url.path().ends_with('/') {
            return Err(CoreError::Config(format!(
                "api_base_url must end with '/': {}",
                self.api_base_url
            )));
        }
        Ok(())
    }

    /// Get the API base URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn transient_retry_interval(&self) -> Duration {
        Duration::from_millis(self.transient_retry_interval_ms)
    }

    pub fn connectivity_prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity_prompt_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.transient_retry_attempts, 3);
        assert_eq!(config.transient_retry_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_load_from_file_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        std::fs::write(&config_path, r#"{ "log_level": "debug" }"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.connectivity_prompt_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.api_base_url = "http://localhost:8000/api/".to_string();
        config.transient_retry_attempts = 5;
        config.save(&paths).unwrap();

        let loaded = Config::load(&paths).unwrap();
        assert_eq!(loaded.transient_retry_attempts, 5);
        assert_eq!(loaded.api_base_url().unwrap().port(), Some(8000));
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.transient_retry_interval_ms, 1000);
    }

    #[test]
    fn test_config_rejects_base_url_without_trailing_slash() {
        let config = Config {
            api_base_url: "https://example.com/api".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_config_invalid_url() {
        let config = Config {
            api_base_url: "not a valid url".to_string(),
            ..Config::default()
        };
        assert!(config.api_base_url().is_err());
    }
}
