//! The turn orchestrator: one caller utterance in, one spoken reply out.
//!
//! Stage order is load-bearing. The caller's transcribed utterance is
//! appended to the conversation log *before* any generation work, so a
//! failure later in the turn cannot lose it. The assistant turn is appended
//! before synthesis, so the reply text is durable even when synthesis or
//! upload fails — that failure still aborts the turn, and the caller
//! recovers by speaking again on the next recording loop.
//!
//! Conversation context is recomputed from the store on every turn; the
//! orchestrator holds no history across requests. Two near-simultaneous
//! turns for the same caller can interleave their context reads and
//! writes — an accepted limitation of the lock-free store.

use std::sync::Arc;

use parley_conversation::{build_context, ConversationError, CreateTurnParams};
use parley_db::DbPool;
use parley_types::{ChatMessage, Turn, TurnRole};

use crate::config::AgentConfig;
use crate::error::TurnError;
use crate::traits::{
    AudioArchive, RecordingSource, ReplyGenerator, SpeechSynthesizer, Transcriber,
};

/// Result of a successful turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    /// The generated assistant reply.
    pub reply_text: String,
    /// Time-limited URL of the archived reply audio.
    pub audio_url: String,
}

/// Composes the external capabilities into one conversational turn.
///
/// All handles are injected at construction; nothing here is a process-wide
/// singleton, so tests swap in fakes per capability.
pub struct TurnOrchestrator {
    pool: DbPool,
    recordings: Arc<dyn RecordingSource>,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn ReplyGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    archive: Arc<dyn AudioArchive>,
    config: AgentConfig,
}

impl TurnOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: DbPool,
        recordings: Arc<dyn RecordingSource>,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn ReplyGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        archive: Arc<dyn AudioArchive>,
        config: AgentConfig,
    ) -> Self {
        Self {
            pool,
            recordings,
            transcriber,
            generator,
            synthesizer,
            archive,
            config,
        }
    }

    /// Processes one recorded utterance and returns the reply text plus the
    /// archived audio URL.
    ///
    /// Each stage aborts the turn with its own [`TurnError`] kind. No store
    /// write happens before transcription succeeds; duplicate turns from a
    /// front-end retry are tolerated, not deduplicated.
    pub async fn process_turn(
        &self,
        recording_url: &str,
        caller: &str,
        call_sid: &str,
    ) -> Result<TurnReply, TurnError> {
        tracing::info!(caller, call_sid, recording_url, "processing turn");

        let audio = self.recordings.fetch(recording_url).await?;
        tracing::info!(caller, call_sid, bytes = audio.len(), "recording downloaded");

        let transcript = self.transcriber.transcribe(audio).await?;
        tracing::info!(caller, call_sid, transcript = %transcript, "utterance transcribed");

        self.append(CreateTurnParams {
            call_sid: call_sid.to_string(),
            caller: caller.to_string(),
            role: TurnRole::User,
            content: transcript,
            recording_url: Some(recording_url.to_string()),
        })
        .await?;

        let context = self.load_context(caller).await?;
        let reply = self.generator.generate(&context).await?;
        tracing::info!(caller, call_sid, reply = %reply, "reply generated");

        let assistant_turn = self
            .append(CreateTurnParams {
                call_sid: call_sid.to_string(),
                caller: caller.to_string(),
                role: TurnRole::Assistant,
                content: reply.clone(),
                recording_url: None,
            })
            .await?;

        let speech = self.synthesizer.synthesize(&reply).await?;
        let name = archive_object_name(caller, &assistant_turn.created_at);
        let audio_url = self.archive.store(speech, &name).await?;
        tracing::info!(caller, call_sid, object = %name, "reply audio archived");

        Ok(TurnReply {
            reply_text: reply,
            audio_url,
        })
    }

    async fn append(&self, params: CreateTurnParams) -> Result<Turn, ConversationError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ConversationError::Unavailable(format!("db connection failed: {e}")))?;
            parley_conversation::append_turn(&conn, &params)
        })
        .await
        .map_err(|e| ConversationError::Unavailable(format!("task join error: {e}")))?
    }

    async fn load_context(&self, caller: &str) -> Result<Vec<ChatMessage>, ConversationError> {
        let pool = self.pool.clone();
        let caller = caller.to_string();
        let instruction = self.config.system_instruction.clone();
        let window = self.config.context_window;
        tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| ConversationError::Unavailable(format!("db connection failed: {e}")))?;
            build_context(&conn, &caller, &instruction, window)
        })
        .await
        .map_err(|e| ConversationError::Unavailable(format!("task join error: {e}")))?
    }
}

/// Deterministic archive object name for a turn's reply audio.
pub fn archive_object_name(caller: &str, timestamp: &str) -> String {
    format!("{caller}/audio-{timestamp}.mp3")
}
