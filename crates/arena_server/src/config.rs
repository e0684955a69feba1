//! Server and oracle configuration.

use crate::llm_client::{LlmConfig, LlmProvider};
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Where opponent move suggestions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OracleBackend {
    /// OpenAI chat completions.
    OpenAI,
    /// Anthropic messages API.
    Anthropic,
    /// No external source; every move is the random fallback.
    Random,
}

/// Settings for the move suggestion source.
#[derive(Debug, Clone, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct OracleConfig {
    /// Suggestion backend.
    #[serde(default = "default_backend")]
    provider: OracleBackend,

    /// LLM model name (e.g. "gpt-3.5-turbo", "claude-3-5-haiku-20241022").
    #[serde(default = "default_model")]
    model: String,

    /// Maximum tokens for the reply.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    temperature: f32,

    /// Upper bound on waiting for a suggestion, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
}

fn default_backend() -> OracleBackend {
    OracleBackend::OpenAI
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    50
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_backend(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl OracleConfig {
    /// Suggestion timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Creates the LLM configuration for the selected backend.
    ///
    /// Requires OPENAI_API_KEY or ANTHROPIC_API_KEY depending on the provider.
    /// Returns `Ok(None)` for the random backend.
    #[instrument(skip(self), fields(provider = %self.provider, model = %self.model))]
    pub fn create_llm_config(&self) -> Result<Option<LlmConfig>, ConfigError> {
        let (provider, var) = match self.provider {
            OracleBackend::OpenAI => (LlmProvider::OpenAI, "OPENAI_API_KEY"),
            OracleBackend::Anthropic => (LlmProvider::Anthropic, "ANTHROPIC_API_KEY"),
            OracleBackend::Random => {
                debug!("Random backend selected, no LLM config needed");
                return Ok(None);
            }
        };

        let api_key = std::env::var(var)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::new(format!("{} environment variable not set", var)))?;

        Ok(Some(LlmConfig::new(
            provider,
            api_key,
            self.model.clone(),
            self.max_tokens,
            self.temperature,
            self.timeout(),
        )))
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind to.
    #[serde(default = "default_port")]
    port: u16,

    /// SQLite file for completed games. Unset keeps them in memory.
    #[serde(default)]
    #[setters(strip_option)]
    db_path: Option<String>,

    /// Move suggestion settings.
    #[serde(default)]
    oracle: OracleConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: None,
            oracle: OracleConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(port = config.port, provider = %config.oracle.provider, "Config loaded successfully");
        Ok(config)
    }

    /// Applies `HOST`, `PORT` and `GAME_DB_PATH` environment overrides.
    #[instrument(skip(self))]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("HOST") {
            debug!(%host, "HOST override");
            self.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(e) => warn!(%port, error = %e, "Ignoring unparseable PORT"),
            }
        }
        if let Ok(path) = std::env::var("GAME_DB_PATH") {
            debug!(%path, "GAME_DB_PATH override");
            self.db_path = Some(path);
        }
        self
    }

    /// Socket address string, `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
