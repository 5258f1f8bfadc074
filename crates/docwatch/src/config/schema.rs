use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_API_KEY_ENV: &str = "DOCWATCH_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub watch_directory: String,
    pub output_directory: String,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Enqueue PDFs already sitting in the watch directory at startup.
    #[serde(default)]
    pub scan_existing: bool,
    #[serde(default)]
    pub stability: StabilityConfig,
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn watch_directory(&self) -> PathBuf {
        PathBuf::from(&self.watch_directory)
    }

    pub fn output_directory(&self) -> PathBuf {
        PathBuf::from(&self.output_directory)
    }
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_stability_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_stability_timeout_secs() -> u64 {
    30
}

impl StabilityConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_stability_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub document_extract_url: String,
    pub entity_extract_url: String,
    /// Inline key, only meant for local testing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl ExtractionConfig {
    /// Resolves the bearer token: the inline `api_key` wins over `api_key_env`.
    pub fn resolve_api_key(&self) -> Result<SecretString, ConfigError> {
        if let Some(value) = self.api_key.as_deref() {
            if !value.is_empty() {
                return Ok(SecretString::from(value.to_string()));
            }
        }

        match std::env::var(&self.api_key_env) {
            Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value.trim())),
            Ok(_) => Err(ConfigError::ApiKey(format!(
                "environment variable '{}' is empty",
                self.api_key_env
            ))),
            Err(std::env::VarError::NotPresent) => Err(ConfigError::ApiKey(format!(
                "environment variable '{}' not set",
                self.api_key_env
            ))),
            Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::ApiKey(format!(
                "environment variable '{}' contains invalid UTF-8",
                self.api_key_env
            ))),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file path; stderr when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}
