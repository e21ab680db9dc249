//! Configuration management for Reactant
//!
//! Loads and saves provider, agent and tool settings as JSON, with
//! environment overrides for the LLM endpoint.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, transcripts_dir};

/// Environment variable overriding the model id
pub const ENV_MODEL_ID: &str = "LLM_MODEL_ID";
/// Environment variable overriding the API key
pub const ENV_API_KEY: &str = "LLM_API_KEY";
/// Environment variable overriding the API base URL
pub const ENV_BASE_URL: &str = "LLM_BASE_URL";
/// Environment variable overriding the request timeout (seconds)
pub const ENV_TIMEOUT: &str = "LLM_TIMEOUT";

/// Errors in configuration handling
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// LLM endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_tokens() -> u32 {
    1024
}

/// What to do when one reply carries more than one Thought/Action pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MultiActionPolicy {
    /// Keep the first pair, drop the rest
    #[default]
    Truncate,
    /// Treat the reply as malformed
    Reject,
}

/// How the outgoing message list is assembled each step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// System prompt followed by the history as chat messages
    #[default]
    Chat,
    /// One user message holding the whole transcript
    Transcript,
}

/// Backoff for failed LLM calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

/// Agent loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Consecutive parse/transport faults before the run is aborted (0 = never)
    #[serde(default = "default_max_consecutive_faults")]
    pub max_consecutive_faults: u32,
    #[serde(default)]
    pub multi_action: MultiActionPolicy,
    #[serde(default)]
    pub prompt_mode: PromptMode,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_consecutive_faults: default_max_consecutive_faults(),
            multi_action: MultiActionPolicy::default(),
            prompt_mode: PromptMode::default(),
            retry: RetrySettings::default(),
        }
    }
}

fn default_max_steps() -> u32 {
    5
}

fn default_max_consecutive_faults() -> u32 {
    3
}

/// A declared tool parameter. Parameters with a default are optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A tool backed by a shell command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandToolConfig {
    pub name: String,
    pub description: String,
    pub command: String,
    #[serde(default)]
    pub params: Vec<ParamConfig>,
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub tools: Vec<CommandToolConfig>,
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Ok(Self::load_from(&path).await?.with_env())
    }

    /// Load from specific location
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no config found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Reject settings the agent cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_steps == 0 {
            return Err(ConfigError::Invalid("agent.max_steps must be at least 1".into()));
        }
        for tool in &self.tools {
            if tool.name.trim().is_empty() {
                return Err(ConfigError::Invalid("tool with empty name".into()));
            }
            if tool.command.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "tool '{}' has no command",
                    tool.name
                )));
            }
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(model) = non_empty(ENV_MODEL_ID) {
            self.provider.model = model;
        }
        if let Some(key) = non_empty(ENV_API_KEY) {
            self.provider.api_key = key;
        }
        if let Some(base) = non_empty(ENV_BASE_URL) {
            self.provider.api_base = Some(base);
        }
        if let Some(timeout) = non_empty(ENV_TIMEOUT) {
            match timeout.trim().parse::<u64>() {
                Ok(secs) => self.provider.timeout_secs = secs,
                Err(_) => warn!("ignoring non-numeric {}={:?}", ENV_TIMEOUT, timeout),
            }
        }
        self
    }

    /// Configured API key, if any
    pub fn api_key(&self) -> Option<String> {
        let key = self.provider.api_key.trim();
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }

    /// Whether an API key is available
    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Configured API base, if any
    pub fn api_base(&self) -> Option<String> {
        self.provider
            .api_base
            .as_ref()
            .filter(|b| !b.trim().is_empty())
            .cloned()
    }

    /// Model id used for every call
    pub fn model(&self) -> String {
        self.provider.model.clone()
    }
}

/// Write a default config if none exists and make sure the data directory is there
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("config already exists at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("config written to {:?}", config_path);
    }

    paths::ensure_dir(&transcripts_dir()).await?;

    Config::load().await
}
