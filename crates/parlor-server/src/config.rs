//! Server configuration loading from file and environment variables.

use parlor_calendar::CalendarConfig;
use parlor_dialog::AssistantConfig;
use parlor_notify::NotifyConfig;
use parlor_voice::TtsConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Front-desk behavior settings.
    #[serde(default)]
    pub business: BusinessConfig,

    /// Conversation policy selection.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Speech synthesis provider settings.
    #[serde(default)]
    pub tts: TtsConfig,

    /// Assistant (LLM) provider settings.
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Calendar provider settings.
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Confirmation messaging settings.
    #[serde(default)]
    pub notify: NotifyConfig,
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

    /// Externally reachable base URL for audio playback links. When empty
    /// the per-request Host and X-Forwarded-Proto headers are used instead.
    #[serde(default)]
    pub public_url: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "parlor_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Front-desk behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessConfig {
    /// The name spoken in the greeting and used in confirmations.
    #[serde(default = "default_business_name")]
    pub name: String,

    /// Opening line played when a call connects.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Closing line appended when the assistant ends a call.
    #[serde(default = "default_goodbye")]
    pub goodbye: String,

    /// Sessions with no caller activity for this long are evicted.
    #[serde(default = "default_idle_session_ttl")]
    pub idle_session_ttl_seconds: u64,
}

/// Which conversation policy drives the call.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Either "keyword" (rule-based) or "assistant" (LLM-driven).
    #[serde(default = "default_policy_kind")]
    pub kind: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_business_name() -> String {
    "Luna Hair Studio".to_string()
}

fn default_greeting() -> String {
    "Thank you for calling Luna Hair Studio! This is Luna. How can I help you today?".to_string()
}

fn default_goodbye() -> String {
    "Thank you for calling. Goodbye!".to_string()
}

fn default_idle_session_ttl() -> u64 {
    30 * 60
}

fn default_policy_kind() -> String {
    "keyword".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: String::new(),
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

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            name: default_business_name(),
            greeting: default_greeting(),
            goodbye: default_goodbye(),
            idle_session_ttl_seconds: default_idle_session_ttl(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: default_policy_kind(),
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
/// - `PARLOR_HOST` overrides `server.host`
/// - `PARLOR_PORT` overrides `server.port`
/// - `PARLOR_PUBLIC_URL` overrides `server.public_url`
/// - `PARLOR_LOG_LEVEL` overrides `logging.level`
/// - `PARLOR_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `PARLOR_POLICY` overrides `policy.kind`
/// - `PARLOR_TTS_API_KEY` overrides `tts.api_key`
/// - `PARLOR_ASSISTANT_API_KEY` overrides `assistant.api_key`
/// - `PARLOR_CALENDAR_REFRESH_TOKEN` overrides `calendar.refresh_token`
/// - `PARLOR_NOTIFY_AUTH_TOKEN` overrides `notify.auth_token`
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
    if let Ok(host) = std::env::var("PARLOR_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("PARLOR_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(url) = std::env::var("PARLOR_PUBLIC_URL") {
        config.server.public_url = url;
    }
    if let Ok(level) = std::env::var("PARLOR_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("PARLOR_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(kind) = std::env::var("PARLOR_POLICY") {
        config.policy.kind = kind;
    }
    if let Ok(key) = std::env::var("PARLOR_TTS_API_KEY") {
        config.tts.api_key = key;
    }
    if let Ok(key) = std::env::var("PARLOR_ASSISTANT_API_KEY") {
        config.assistant.api_key = key;
    }
    if let Ok(token) = std::env::var("PARLOR_CALENDAR_REFRESH_TOKEN") {
        config.calendar.refresh_token = token;
    }
    if let Ok(token) = std::env::var("PARLOR_NOTIFY_AUTH_TOKEN") {
        config.notify.auth_token = token;
    }

    Ok(config)
}
