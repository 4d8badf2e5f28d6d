//! Server configuration loading from file and environment variables.

use parley_agent::{
    AgentConfig, ArchiveConfig, ChatConfig, RetryPolicy, SpeechConfig, TelephonyConfig,
    TranscriptionConfig,
};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Call-flow settings for the webhook response documents.
    #[serde(default)]
    pub call: CallConfig,

    /// Telephony provider credentials for recording downloads.
    pub telephony: TelephonyConfig,

    /// Recording download retry policy.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Speech-to-text adapter settings.
    pub transcription: TranscriptionConfig,

    /// Chat completion adapter settings.
    pub chat: ChatConfig,

    /// Text-to-speech adapter settings.
    pub speech: SpeechConfig,

    /// Audio archive settings.
    pub archive: ArchiveConfig,

    /// Pipeline settings: system instruction and context window.
    #[serde(default)]
    pub agent: AgentConfig,
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

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "parley_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Call-flow wording and recording parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct CallConfig {
    /// Spoken greeting when a call is answered.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Spoken message when a turn fails; the caller is re-prompted to speak.
    #[serde(default = "default_failure_message")]
    pub failure_message: String,

    /// Language attribute for spoken prompts.
    #[serde(default = "default_call_language")]
    pub language: String,

    /// Maximum recording length per utterance, in seconds.
    #[serde(default = "default_record_max_length_secs")]
    pub record_max_length_secs: u32,

    /// Silence that ends a recording, in seconds.
    #[serde(default = "default_record_timeout_secs")]
    pub record_timeout_secs: u32,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "parley.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_greeting() -> String {
    "Hola, ¿cómo puedo ayudarte?".to_string()
}

fn default_failure_message() -> String {
    "Lo siento, ocurrió un error procesando tu mensaje. Por favor, inténtalo de nuevo."
        .to_string()
}

fn default_call_language() -> String {
    "es-mx".to_string()
}

fn default_record_max_length_secs() -> u32 {
    60
}

fn default_record_timeout_secs() -> u32 {
    2
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
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

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            failure_message: default_failure_message(),
            language: default_call_language(),
            record_max_length_secs: default_record_max_length_secs(),
            record_timeout_secs: default_record_timeout_secs(),
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

/// Loads configuration from a TOML file.
///
/// Unlike purely-local services, the server cannot start without provider
/// credentials, so a missing file is an error rather than a silent fall
/// back to defaults. Secrets may be left empty in the file and supplied
/// via environment instead.
///
/// Environment variable overrides:
/// - `PARLEY_HOST` overrides `server.host`
/// - `PARLEY_PORT` overrides `server.port`
/// - `PARLEY_DB_PATH` overrides `database.path`
/// - `PARLEY_LOG_LEVEL` overrides `logging.level`
/// - `PARLEY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `PARLEY_TWILIO_AUTH_TOKEN` overrides `telephony.auth_token`
/// - `PARLEY_OPENAI_API_KEY` overrides `transcription.api_key` and `chat.api_key`
/// - `PARLEY_SPEECH_KEY` overrides `speech.subscription_key`
/// - `PARLEY_STORAGE_KEY` overrides `archive.access_key`
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&contents)?;

    // Environment variable overrides
    if let Ok(host) = std::env::var("PARLEY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("PARLEY_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("PARLEY_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("PARLEY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("PARLEY_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(token) = std::env::var("PARLEY_TWILIO_AUTH_TOKEN") {
        config.telephony.auth_token = token;
    }
    if let Ok(key) = std::env::var("PARLEY_OPENAI_API_KEY") {
        config.transcription.api_key = key.clone();
        config.chat.api_key = key;
    }
    if let Ok(key) = std::env::var("PARLEY_SPEECH_KEY") {
        config.speech.subscription_key = key;
    }
    if let Ok(key) = std::env::var("PARLEY_STORAGE_KEY") {
        config.archive.access_key = key;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [telephony]
        account_sid = "AC123"
        auth_token = "token"

        [transcription]
        endpoint = "https://example.openai.azure.com/"
        api_key = "k1"

        [chat]
        endpoint = "https://example.openai.azure.com/"
        api_key = "k2"

        [speech]
        subscription_key = "k3"

        [archive]
        account = "acct"
        access_key = "a2V5"
    "#;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: Config = toml::from_str(MINIMAL).expect("minimal config should parse");

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.path, "parley.db");
        assert_eq!(config.call.record_max_length_secs, 60);
        assert_eq!(config.call.record_timeout_secs, 2);
        assert_eq!(config.retry.attempts, 6);
        assert_eq!(config.agent.context_window, 5);
        assert_eq!(config.speech.voice, "es-MX-DaliaNeural");
        assert_eq!(config.transcription.language, "es");
    }

    #[test]
    fn missing_required_sections_fail_to_parse() {
        let err = toml::from_str::<Config>("[server]\nport = 8080").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("telephony") || msg.contains("missing field"), "{msg}");
    }
}
