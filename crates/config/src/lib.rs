//! Configuration loading, validation, and management for hcplog.
//!
//! Loads configuration from `~/.hcplog/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.hcplog/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which collaborator answers chat turns and how to reach it
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Per-conversation behaviour
    #[serde(default)]
    pub session: SessionConfig,
}

/// Assistant collaborator settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// `http` (CRM chat backend) or `openai` (OpenAI-compatible LLM)
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Base URL. Defaults depend on `kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// API key (only used by `openai`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name (only used by `openai`)
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Give up on a turn after this many seconds (no limit when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_kind() -> String {
    "http".into()
}
fn default_model() -> String {
    "gemma2-9b-it".into()
}
fn default_temperature() -> f32 {
    0.0
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("kind", &self.kind)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            api_url: None,
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: None,
        }
    }
}

impl AssistantConfig {
    /// Whether an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// First assistant message of every conversation
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Assistant message appended when the collaborator fails
    #[serde(default = "default_failure_message")]
    pub failure_message: String,

    /// Let a collaborator's explicit patch/full tag override the key count
    #[serde(default)]
    pub honor_payload_tags: bool,
}

fn default_greeting() -> String {
    "Hi! Tell me about your HCP interaction and I'll fill in the form.".into()
}
fn default_failure_message() -> String {
    "Sorry, I couldn't reach the assistant. Please try again.".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            failure_message: default_failure_message(),
            honor_payload_tags: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.hcplog/config.toml).
    ///
    /// Also checks environment variables:
    /// - `HCPLOG_API_KEY`, then `GROQ_API_KEY`, then `OPENAI_API_KEY`
    /// - `HCPLOG_ASSISTANT_URL`
    /// - `HCPLOG_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.assistant.api_key.is_none() {
            self.assistant.api_key = lookup("HCPLOG_API_KEY")
                .or_else(|| lookup("GROQ_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(url) = lookup("HCPLOG_ASSISTANT_URL") {
            self.assistant.api_url = Some(url);
        }

        if let Some(model) = lookup("HCPLOG_MODEL") {
            self.assistant.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".hcplog")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.assistant.kind.as_str(), "http" | "openai") {
            return Err(ConfigError::ValidationError(format!(
                "assistant.kind must be \"http\" or \"openai\", got \"{}\"",
                self.assistant.kind
            )));
        }

        if !(0.0..=2.0).contains(&self.assistant.temperature) {
            return Err(ConfigError::ValidationError(
                "assistant.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.assistant.timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "assistant.timeout_secs must be > 0 when set".into(),
            ));
        }

        if self.session.failure_message.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "session.failure_message must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
