//! Server configuration loading from file and environment variables.

use banter_agent::{GeneratorConfig, OpenAiConfig, DEFAULT_HISTORY_CAP};
use banter_voice::LiveKitConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// LiveKit connection settings.
    #[serde(default)]
    pub livekit: LiveKitSettings,

    /// Voice-agent generation settings.
    #[serde(default)]
    pub agent: AgentSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// LiveKit settings. All fields default to empty so the server can start
/// degraded without a `[livekit]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveKitSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// Browser-facing URL when it differs from the internal one.
    #[serde(default)]
    pub public_url: String,
}

impl LiveKitSettings {
    pub fn to_livekit_config(&self) -> LiveKitConfig {
        let mut config = LiveKitConfig::new(&self.url, &self.api_key, &self.api_secret);
        config.public_url = self.public_url.clone();
        config
    }
}

/// Voice-agent generation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    /// OpenAI-compatible endpoint base URL, up to the version segment.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Total generation attempts before falling back.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff base in milliseconds; attempt N waits N times this.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Per-room cap on stored history messages.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

impl AgentSettings {
    pub fn to_openai_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn to_generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            system_prompt: self.system_prompt.clone(),
            max_attempts: self.max_attempts,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "banter_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

fn default_system_prompt() -> String {
    GeneratorConfig::default().system_prompt
}

fn default_max_attempts() -> u32 {
    GeneratorConfig::default().max_attempts
}

fn default_retry_base_delay_ms() -> u64 {
    GeneratorConfig::default().retry_base_delay.as_millis() as u64
}

fn default_history_cap() -> usize {
    DEFAULT_HISTORY_CAP
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: String::new(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            history_cap: default_history_cap(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `BANTER_HOST` overrides `server.host`
/// - `BANTER_PORT` overrides `server.port`
/// - `BANTER_LIVEKIT_URL` overrides `livekit.url`
/// - `BANTER_LIVEKIT_API_KEY` overrides `livekit.api_key`
/// - `BANTER_LIVEKIT_API_SECRET` overrides `livekit.api_secret`
/// - `BANTER_LIVEKIT_PUBLIC_URL` overrides `livekit.public_url`
/// - `BANTER_LLM_BASE_URL` overrides `agent.base_url`
/// - `BANTER_LLM_API_KEY` overrides `agent.api_key`
/// - `BANTER_LLM_MODEL` overrides `agent.model`
/// - `BANTER_LOG_LEVEL` overrides `logging.level`
/// - `BANTER_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("BANTER_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("BANTER_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(url) = std::env::var("BANTER_LIVEKIT_URL") {
        config.livekit.url = url;
    }
    if let Ok(key) = std::env::var("BANTER_LIVEKIT_API_KEY") {
        config.livekit.api_key = key;
    }
    if let Ok(secret) = std::env::var("BANTER_LIVEKIT_API_SECRET") {
        config.livekit.api_secret = secret;
    }
    if let Ok(url) = std::env::var("BANTER_LIVEKIT_PUBLIC_URL") {
        config.livekit.public_url = url;
    }
    if let Ok(url) = std::env::var("BANTER_LLM_BASE_URL") {
        config.agent.base_url = url;
    }
    if let Ok(key) = std::env::var("BANTER_LLM_API_KEY") {
        config.agent.api_key = key;
    }
    if let Ok(model) = std::env::var("BANTER_LLM_MODEL") {
        config.agent.model = model;
    }
    if let Ok(level) = std::env::var("BANTER_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("BANTER_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
