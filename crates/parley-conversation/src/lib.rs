//! Conversation store for the Parley voice agent.
//!
//! Implements the append-only conversation log and the context builder that
//! turns a caller's history into the prompt for the chat completion API.
//!
//! The log is partitioned by a message-type tag and keyed by caller phone
//! number. Rows carry the role-tagged payload as JSON, so a stored turn
//! deserializes directly into prompt context. Retrieval sorts by the
//! store-assigned row ID — the total insert order — which makes read order
//! deterministic even when two turns land in the same timestamp tick.
//!
//! The store is the single source of truth for conversation history: the
//! orchestrator recomputes context from it on every turn and never caches
//! it across requests. Duplicate appends from front-end retries are
//! tolerated, not deduplicated — no dedup key exists.

use chrono::Utc;
use parley_types::{
    ChatMessage, Turn, TurnRole, MESSAGE_SOURCE_PHONE, MESSAGE_TYPE_TRANSCRIPTION,
};
use rusqlite::{params, Connection, Row};
use thiserror::Error;

/// Number of most-recent turns included in the prompt when the caller's
/// history is longer than the configured window.
pub const DEFAULT_CONTEXT_WINDOW: usize = 5;

/// Errors that can occur during conversation store operations.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("message payload error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Parameters for appending a new turn to the log.
#[derive(Debug, Clone)]
pub struct CreateTurnParams {
    pub call_sid: String,
    pub caller: String,
    pub role: TurnRole,
    pub content: String,
    /// Provider recording reference; set on user turns only.
    pub recording_url: Option<String>,
}

/// Returns the current UTC time in the conversation log's timestamp format.
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.6f+00:00").to_string()
}

/// Appends a turn to the conversation log and returns the stored row.
///
/// The row ID assigned by the store is the total insert order; the
/// timestamp is recorded for display and archive naming but is never the
/// ordering key.
pub fn append_turn(conn: &Connection, params: &CreateTurnParams) -> Result<Turn, ConversationError> {
    let message = ChatMessage::new(params.role.as_str(), params.content.clone());
    let message_json = serde_json::to_string(&message)?;
    let created_at = now_timestamp();

    let id = conn.query_row(
        "INSERT INTO turns (message_type, call_sid, caller, source, created_at, message_json, recording_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         RETURNING id",
        params![
            MESSAGE_TYPE_TRANSCRIPTION,
            params.call_sid,
            params.caller,
            MESSAGE_SOURCE_PHONE,
            created_at,
            message_json,
            params.recording_url,
        ],
        |row| row.get::<_, i64>(0),
    )?;

    Ok(Turn {
        id,
        message_type: MESSAGE_TYPE_TRANSCRIPTION.to_string(),
        call_sid: params.call_sid.clone(),
        caller: params.caller.clone(),
        source: MESSAGE_SOURCE_PHONE.to_string(),
        created_at,
        message,
        recording_url: params.recording_url.clone(),
    })
}

/// Returns the full history for a caller, oldest first.
pub fn turns_for_caller(conn: &Connection, caller: &str) -> Result<Vec<Turn>, ConversationError> {
    let mut stmt = conn.prepare(
        "SELECT id, message_type, call_sid, caller, source, created_at, message_json, recording_url
         FROM turns WHERE caller = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map([caller], map_row_to_turn)?;
    collect_turns(rows)
}

/// Returns the most recent `window` turns for a caller, oldest first.
///
/// Fewer than `window` turns exist for a new caller; all of them are
/// returned. The common case — first call from a new number — yields an
/// empty list.
pub fn recent_turns(
    conn: &Connection,
    caller: &str,
    window: usize,
) -> Result<Vec<Turn>, ConversationError> {
    let mut stmt = conn.prepare(
        "SELECT id, message_type, call_sid, caller, source, created_at, message_json, recording_url
         FROM turns WHERE caller = ?1 ORDER BY id DESC LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![caller, window as i64], map_row_to_turn)?;
    let mut turns = collect_turns(rows)?;
    turns.reverse();
    Ok(turns)
}

/// Builds the prompt context for a caller: the constant system instruction
/// at position 0, followed by the caller's last `window` turns in insert
/// order. The instruction itself is never persisted as a turn.
pub fn build_context(
    conn: &Connection,
    caller: &str,
    system_instruction: &str,
    window: usize,
) -> Result<Vec<ChatMessage>, ConversationError> {
    let turns = recent_turns(conn, caller, window)?;

    let mut context = Vec::with_capacity(turns.len() + 1);
    context.push(ChatMessage::system(system_instruction));
    context.extend(turns.into_iter().map(|t| t.message));
    Ok(context)
}

/// Counts all turns stored for a caller.
pub fn turn_count(conn: &Connection, caller: &str) -> Result<i64, ConversationError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM turns WHERE caller = ?1",
        [caller],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn map_row_to_turn(row: &Row<'_>) -> rusqlite::Result<Turn> {
    let message_json: String = row.get(6)?;
    let message: ChatMessage = serde_json::from_str(&message_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Turn {
        id: row.get(0)?,
        message_type: row.get(1)?,
        call_sid: row.get(2)?,
        caller: row.get(3)?,
        source: row.get(4)?,
        created_at: row.get(5)?,
        message,
        recording_url: row.get(7)?,
    })
}

fn collect_turns(
    rows: impl Iterator<Item = rusqlite::Result<Turn>>,
) -> Result<Vec<Turn>, ConversationError> {
    let mut turns = Vec::new();
    for row in rows {
        turns.push(row?);
    }
    Ok(turns)
}
