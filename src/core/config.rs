//! Configuration management for bankdesk
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/bankdesk/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::{DeskError, Result};

/// Main configuration for bankdesk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Model configuration
    #[serde(default)]
    pub models: ModelConfig,
    /// Group chat behaviour
    #[serde(default)]
    pub chat: ChatConfig,
    /// Retry behaviour around LLM calls
    #[serde(default)]
    pub retry: RetryConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Models used by agents and by the turn policies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model every agent talks to
    pub agent: String,
    /// Model used by LLM-backed selection and termination
    pub policy: String,
    /// Sampling temperature for agent turns
    pub agent_temperature: f32,
    /// Sampling temperature for policy decisions
    pub policy_temperature: f32,
}

/// How the next speaker and the end of a round are decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Ask the policy model
    Llm,
    /// Deterministic keyword rules
    Rules,
}

impl std::str::FromStr for PolicyMode {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "llm" => Ok(PolicyMode::Llm),
            "rules" | "rule" => Ok(PolicyMode::Rules),
            other => Err(DeskError::config(format!(
                "unknown policy mode '{}', expected 'llm' or 'rules'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyMode::Llm => write!(f, "llm"),
            PolicyMode::Rules => write!(f, "rules"),
        }
    }
}

/// Group chat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Hard cap on agent turns per round
    /// Default: 50
    pub max_iterations: usize,
    /// History entries shown to the selection policy
    /// Default: 1
    pub selection_window: usize,
    /// History entries shown to the termination policy
    /// Default: 1
    pub termination_window: usize,
    /// History entries shown to agents (unset = whole history)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_window: Option<usize>,
    /// Tool call/response exchanges allowed inside one agent turn
    /// Default: 4
    pub max_tool_rounds: usize,
    /// Policy implementation
    pub policy_mode: PolicyMode,
}

/// Retry configuration for provider calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: usize,
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Growth factor between retries
    pub backoff_multiplier: f32,
    /// Upper bound on a single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Add up to 30% random jitter to each delay
    pub jitter: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive
    pub filter: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            timeout_secs: 120,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            agent: env::var("BANKDESK_AGENT_MODEL").unwrap_or_else(|_| "qwen3:8b".to_string()),
            policy: env::var("BANKDESK_POLICY_MODEL").unwrap_or_else(|_| "qwen3:8b".to_string()),
            agent_temperature: 0.3,
            policy_temperature: 0.0,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            selection_window: 1,
            termination_window: 1,
            agent_window: None,
            max_tool_rounds: 4,
            policy_mode: env::var("BANKDESK_POLICY_MODE")
                .ok()
                .and_then(|m| m.parse().ok())
                .unwrap_or(PolicyMode::Llm),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 500,
            backoff_multiplier: 2.0,
            max_delay_ms: 8000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// No retries at all
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: env::var("BANKDESK_LOG").unwrap_or_else(|_| "warn".to_string()),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bankdesk")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read or parsed is an error; callers decide whether to fall back.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        if !Self::config_file().exists() {
            return Ok(Self::default());
        }
        Self::load_from_file()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(DeskError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| DeskError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| DeskError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| DeskError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| DeskError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| DeskError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Check the values that would otherwise fail deep inside a round
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.ollama_url())
            .map_err(|e| DeskError::config(format!("Invalid Ollama URL: {}", e)))?;

        if self.chat.max_iterations == 0 {
            return Err(DeskError::config("chat.max_iterations must be at least 1"));
        }
        if self.chat.selection_window == 0 || self.chat.termination_window == 0 {
            return Err(DeskError::config("policy windows must be at least 1"));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(DeskError::config("retry.backoff_multiplier must be >= 1.0"));
        }

        Ok(())
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        toml::to_string_pretty(&Config::default())
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}
