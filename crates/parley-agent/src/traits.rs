//! Capability traits for the pipeline's external collaborators.
//!
//! The orchestrator only sees these contracts. Each provider adapter in
//! this crate implements one; tests substitute fakes. All traits are
//! object-safe so the orchestrator can hold `Arc<dyn …>` handles built
//! once at startup and shared across request handlers.

use async_trait::async_trait;
use parley_types::ChatMessage;

use crate::error::{
    ArchiveError, FetchError, GenerationError, SynthesisError, TranscriptionError,
};

/// Retrieves a recorded audio asset from the telephony provider given an
/// opaque recording reference.
#[async_trait]
pub trait RecordingSource: Send + Sync {
    async fn fetch(&self, recording_url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Converts raw audio bytes to text in a fixed source language.
///
/// Takes ownership of the buffer: the recording exists only for the
/// lifetime of one turn and is consumed here.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, TranscriptionError>;
}

/// Given an ordered list of role-tagged messages, returns the next
/// assistant message.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerationError>;
}

/// Converts text to synthesized audio bytes in a fixed voice and language.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError>;
}

/// Durable object store that accepts audio bytes and returns a
/// time-limited, publicly fetchable URL.
#[async_trait]
pub trait AudioArchive: Send + Sync {
    async fn store(&self, audio: Vec<u8>, name: &str) -> Result<String, ArchiveError>;
}
