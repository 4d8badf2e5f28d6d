//! Turn-processing pipeline for the Parley voice agent.
//!
//! One conversational turn runs through a fixed sequence of stages:
//! download the caller's recording, transcribe it, rebuild the caller's
//! conversation context, generate a reply, persist both sides of the
//! exchange, synthesize the reply to speech, and archive the audio under a
//! time-limited URL.
//!
//! The five external collaborators — recording provider, speech-to-text,
//! chat completion, text-to-speech, and the audio archive — are reached
//! through object-safe traits ([`traits`]), so the orchestrator takes
//! explicitly constructed, dependency-injected handles and tests can
//! substitute fakes. The concrete adapters in this crate speak the
//! providers' HTTP wire formats and each carries its own configuration
//! record, including an explicit request timeout.

pub mod archive;
pub mod config;
pub mod error;
pub mod fetch;
pub mod llm;
pub mod orchestrator;
pub mod retry;
pub mod stt;
pub mod traits;
pub mod tts;

pub use archive::BlobArchive;
pub use config::{
    AgentConfig, ArchiveConfig, ChatConfig, RetryPolicy, SpeechConfig, TelephonyConfig,
    TranscriptionConfig,
};
pub use error::{
    ArchiveError, FetchError, GenerationError, SynthesisError, TranscriptionError, TurnError,
};
pub use fetch::RecordingFetcher;
pub use llm::ChatService;
pub use orchestrator::{archive_object_name, TurnOrchestrator, TurnReply};
pub use stt::SttService;
pub use traits::{AudioArchive, RecordingSource, ReplyGenerator, SpeechSynthesizer, Transcriber};
pub use tts::TtsService;
