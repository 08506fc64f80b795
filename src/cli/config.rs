//! Configuration management for tokenpipe
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.tokenpipe/config.toml

use crate::cli::args::Verbosity;
use crate::errors::{ClientError, Result};
use crate::generation::RetryPolicy;
use crate::info;
use crate::streaming::DEFAULT_ENDPOINT;
use crate::types::{GenerationRequest, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete configuration for tokenpipe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub retry: RetryConfig,
    pub sampling: SamplingConfig,
    pub logging: LoggingConfig,
}

/// Streaming endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub timeout_secs: u64,
}

/// Retry behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// Default sampling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub temperature: f64,
    pub top_p: f64,
}

/// Logging and terminal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbosity: String,
    /// Log file appended to; empty disables file logging
    pub file: String,
    /// Persist prompt history between sessions
    pub history: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10000,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbosity: "normal".to_string(),
            file: "app.log".to_string(),
            history: true,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ClientError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ClientError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".tokenpipe").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        info::base_url(&self.server.url)
            .map_err(|e| ClientError::ConfigError(format!("Invalid server url: {}", e)))?;

        if self.server.timeout_secs == 0 {
            return Err(ClientError::ConfigError(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ClientError::ConfigError(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ClientError::ConfigError(
                "base_delay_ms must not exceed max_delay_ms".to_string(),
            ));
        }

        if !self.sampling.temperature.is_finite() || !self.sampling.top_p.is_finite() {
            return Err(ClientError::ConfigError(
                "temperature and top_p must be finite".to_string(),
            ));
        }

        if Verbosity::from_name(&self.logging.verbosity).is_none() {
            return Err(ClientError::ConfigError(format!(
                "Invalid verbosity level: {}",
                self.logging.verbosity
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ClientError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClientError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ClientError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Retry policy for every generation
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
            Duration::from_millis(self.retry.max_delay_ms),
        )
    }

    /// Per-attempt request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }

    /// Configured verbosity, falling back to normal for unknown names
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_name(&self.logging.verbosity).unwrap_or(Verbosity::Normal)
    }

    /// Request for `prompt` with the configured sampling parameters
    pub fn request(&self, prompt: &str) -> Result<GenerationRequest> {
        GenerationRequest::with_sampling(prompt, self.sampling.temperature, self.sampling.top_p)
    }

    /// Log file path, if file logging is enabled
    pub fn log_file(&self) -> Option<PathBuf> {
        if self.logging.file.is_empty() {
            None
        } else {
            Some(Self::expand_path(&self.logging.file))
        }
    }

    /// Prompt history path, if history is enabled
    pub fn history_path(&self) -> Option<PathBuf> {
        if !self.logging.history {
            return None;
        }
        dirs::home_dir().map(|home| home.join(".tokenpipe").join("history"))
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }
}
