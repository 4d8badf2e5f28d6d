//! Error types for the turn pipeline.
//!
//! Each stage of the pipeline is a failure boundary with its own error
//! enum; [`TurnError`] is the union the orchestrator surfaces. A failed
//! stage aborts the current turn only — whatever was already durably
//! appended to the conversation log stays.

use parley_conversation::ConversationError;
use thiserror::Error;

/// Recording download failures.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The recording reference could not be resolved to a recording SID.
    #[error("recording reference is not resolvable: {0}")]
    InvalidReference(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Every attempt failed; carries the final failure.
    #[error("recording unobtainable after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Speech-to-text failures.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transcription service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Chat completion failures.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered but produced no usable reply text.
    #[error("chat service returned no reply")]
    EmptyReply,
}

/// Text-to-speech failures. Token exchange and synthesis are separate
/// phases; both fail the stage.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("token exchange returned {status}: {body}")]
    Token { status: u16, body: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("speech service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Audio archive failures.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The configured account key is not valid base64.
    #[error("invalid storage account key: {0}")]
    InvalidKey(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Union of the per-stage failures a turn can abort with.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("recording download failed: {0}")]
    Download(#[from] FetchError),

    #[error("transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    /// Conversation history could not be read or the turn could not be
    /// appended.
    #[error("conversation store error: {0}")]
    Conversation(#[from] ConversationError),

    #[error("reply generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("speech synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("audio archive upload failed: {0}")]
    Storage(#[from] ArchiveError),
}

impl TurnError {
    /// Stable stage label for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Download(_) => "download",
            Self::Transcription(_) => "transcription",
            Self::Conversation(_) => "conversation",
            Self::Generation(_) => "generation",
            Self::Synthesis(_) => "synthesis",
            Self::Storage(_) => "storage",
        }
    }
}
