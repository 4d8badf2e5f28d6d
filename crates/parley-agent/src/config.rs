//! Configuration records for the pipeline and its adapters.
//!
//! Each external collaborator gets its own record with serde defaults, so a
//! deployment overrides only what it needs. Secrets are redacted from
//! `Debug` output. Timeouts and the download retry policy are configuration,
//! not constants — per-deployment tuning never requires a code change.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

fn default_retry_attempts() -> u32 {
    6
}

fn default_retry_warmup_ms() -> u64 {
    1_000
}

fn default_retry_delay_ms() -> u64 {
    500
}

/// Bounded-retry policy for the recording download.
///
/// Defaults: 6 attempts total, a 1 s warm-up before the first attempt
/// (recordings become available at the provider shortly after the webhook
/// fires), and a fixed 0.5 s delay between attempts. No backoff, no jitter
/// — the attempt budget is small and the total window is ~3.5 s.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,

    /// Delay before the first attempt, in milliseconds.
    #[serde(default = "default_retry_warmup_ms")]
    pub warmup_ms: u64,

    /// Fixed delay between attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            warmup_ms: default_retry_warmup_ms(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn default_telephony_api_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Credentials and endpoint for the telephony provider's recording API.
#[derive(Clone, Deserialize)]
pub struct TelephonyConfig {
    /// Provider account identifier.
    pub account_sid: String,

    /// Provider auth token, used for basic auth on recording downloads.
    /// May be omitted in the file and supplied via environment.
    #[serde(default)]
    pub auth_token: String,

    /// API base URL. Overridable for tests.
    #[serde(default = "default_telephony_api_base")]
    pub api_base: String,

    /// Request timeout per HTTP call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for TelephonyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelephonyConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_transcription_deployment() -> String {
    "whisper-1".to_string()
}

fn default_openai_api_version() -> String {
    "2024-06-01".to_string()
}

fn default_transcription_language() -> String {
    "es".to_string()
}

fn default_transcription_timeout_secs() -> u64 {
    60
}

/// Azure OpenAI Whisper transcription settings.
#[derive(Clone, Deserialize)]
pub struct TranscriptionConfig {
    /// Azure OpenAI resource endpoint, e.g. `https://example.openai.azure.com/`.
    pub endpoint: String,

    /// Azure OpenAI API key. May be omitted in the file and supplied via
    /// environment.
    #[serde(default)]
    pub api_key: String,

    /// Whisper deployment name.
    #[serde(default = "default_transcription_deployment")]
    pub deployment: String,

    /// API version query parameter.
    #[serde(default = "default_openai_api_version")]
    pub api_version: String,

    /// Fixed source language for transcription.
    #[serde(default = "default_transcription_language")]
    pub language: String,

    /// Request timeout, in seconds. Transcription of a 60 s recording can
    /// take a while, so this is looser than the other adapters.
    #[serde(default = "default_transcription_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for TranscriptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptionConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("language", &self.language)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_chat_deployment() -> String {
    "gpt-35-turbo".to_string()
}

/// Azure OpenAI chat completion settings.
#[derive(Clone, Deserialize)]
pub struct ChatConfig {
    /// Azure OpenAI resource endpoint.
    pub endpoint: String,

    /// Azure OpenAI API key. May be omitted in the file and supplied via
    /// environment.
    #[serde(default)]
    pub api_key: String,

    /// Chat deployment name.
    #[serde(default = "default_chat_deployment")]
    pub deployment: String,

    /// API version query parameter.
    #[serde(default = "default_openai_api_version")]
    pub api_version: String,

    /// Request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_speech_region() -> String {
    "eastus".to_string()
}

fn default_speech_voice() -> String {
    "es-MX-DaliaNeural".to_string()
}

fn default_speech_language() -> String {
    "es-MX".to_string()
}

fn default_speech_output_format() -> String {
    "audio-16khz-128kbitrate-mono-mp3".to_string()
}

/// Azure Cognitive Speech synthesis settings.
#[derive(Clone, Deserialize)]
pub struct SpeechConfig {
    /// Azure region, e.g. `eastus`.
    #[serde(default = "default_speech_region")]
    pub region: String,

    /// Speech resource subscription key. May be omitted in the file and
    /// supplied via environment.
    #[serde(default)]
    pub subscription_key: String,

    /// Neural voice identifier.
    #[serde(default = "default_speech_voice")]
    pub voice: String,

    /// SSML `xml:lang` value.
    #[serde(default = "default_speech_language")]
    pub language: String,

    /// Output audio format. MP3 so the archived object name and content
    /// type are truthful.
    #[serde(default = "default_speech_output_format")]
    pub output_format: String,

    /// Request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("region", &self.region)
            .field("subscription_key", &"[REDACTED]")
            .field("voice", &self.voice)
            .field("language", &self.language)
            .field("output_format", &self.output_format)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_archive_container() -> String {
    "temp-container".to_string()
}

fn default_sas_ttl_secs() -> i64 {
    3_600
}

/// Blob storage settings for archived reply audio.
#[derive(Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Storage account name.
    pub account: String,

    /// Base64-encoded storage account access key. May be omitted in the
    /// file and supplied via environment.
    #[serde(default)]
    pub access_key: String,

    /// Container that receives archived audio.
    #[serde(default = "default_archive_container")]
    pub container: String,

    /// Endpoint override; defaults to `https://{account}.blob.core.windows.net`.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Lifetime of the read-only URL returned to the caller, in seconds.
    #[serde(default = "default_sas_ttl_secs")]
    pub sas_ttl_secs: i64,

    /// Request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for ArchiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveConfig")
            .field("account", &self.account)
            .field("access_key", &"[REDACTED]")
            .field("container", &self.container)
            .field("endpoint", &self.endpoint)
            .field("sas_ttl_secs", &self.sas_ttl_secs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_system_instruction() -> String {
    "You are a real estate expert, your job is only to explain the \
     characteristics of a property, if the user shows interest, say that you \
     will contact an advisor as soon as possible, your goal is to advise the \
     user superficially and provide first hand information, do not answer \
     topics of conversation irrelevant to your goal. Respond to the user in \
     the spoken language"
        .to_string()
}

fn default_context_window() -> usize {
    parley_conversation::DEFAULT_CONTEXT_WINDOW
}

/// Pipeline-level settings: the system instruction and the context window.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Constant instruction placed at position 0 of every prompt.
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    /// How many of the caller's most recent turns go into the prompt.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_instruction: default_system_instruction(),
            context_window: default_context_window(),
        }
    }
}
