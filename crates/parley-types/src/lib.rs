//! Shared types and constants for the Parley voice agent.
//!
//! This crate provides the foundational types used across all Parley crates:
//! turn roles, chat messages, the persisted turn record, and the constant
//! tags written into every conversation log row.
//!
//! No crate in the workspace depends on anything *except* `parley-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};

/// Partition tag written into every conversation log row.
pub const MESSAGE_TYPE_TRANSCRIPTION: &str = "transcription";

/// Source tag for turns that originate from a phone call.
pub const MESSAGE_SOURCE_PHONE: &str = "phone";

/// Who produced a turn within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The caller's transcribed utterance.
    User,
    /// The agent's generated reply.
    Assistant,
}

impl TurnRole {
    /// Returns the canonical string label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TurnRole {
    type Err = ParseTurnRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(ParseTurnRoleError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown turn role string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown turn role: {0}")]
pub struct ParseTurnRoleError(pub String);

/// A role-tagged message in the shape the chat completion API expects.
///
/// This is also the JSON payload persisted in each conversation log row,
/// so a stored turn deserializes directly into prompt context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `"user"` or `"assistant"` for persisted turns; the context builder
    /// additionally prepends a `"system"` message that is never persisted.
    pub role: String,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// Builds a message with the given role label.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Builds the system instruction message placed at position 0 of every
    /// conversation context.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }
}

/// A persisted conversation turn.
///
/// One row in the conversation log: either the caller's transcribed
/// utterance or the agent's reply. `id` is assigned by the store and is the
/// total insert order — retrieval for a caller sorts by it, so read order is
/// never ambiguous even when two turns share a timestamp string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Store-assigned row ID (insert order).
    pub id: i64,
    /// Partition tag, constant [`MESSAGE_TYPE_TRANSCRIPTION`].
    pub message_type: String,
    /// Provider-assigned call identifier.
    pub call_sid: String,
    /// Caller phone number — the conversation grouping key.
    pub caller: String,
    /// Source tag, constant [`MESSAGE_SOURCE_PHONE`].
    pub source: String,
    /// UTC creation timestamp string.
    pub created_at: String,
    /// The role-tagged payload, stored as JSON.
    pub message: ChatMessage,
    /// Provider recording reference, present on user turns only.
    pub recording_url: Option<String>,
}

impl Turn {
    /// Returns the role of this turn, parsed from the stored payload.
    pub fn role(&self) -> Result<TurnRole, ParseTurnRoleError> {
        self.message.role.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_role_round_trips_through_labels() {
        assert_eq!("user".parse::<TurnRole>().unwrap(), TurnRole::User);
        assert_eq!(
            "assistant".parse::<TurnRole>().unwrap(),
            TurnRole::Assistant
        );
        assert_eq!(TurnRole::User.as_str(), "user");
        assert_eq!(TurnRole::Assistant.as_str(), "assistant");
    }

    #[test]
    fn unknown_role_fails_to_parse() {
        let err = "system".parse::<TurnRole>().unwrap_err();
        assert_eq!(err.0, "system");
    }

    #[test]
    fn chat_message_serializes_to_role_content_object() {
        let msg = ChatMessage::new("user", "Is this house still available?");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"role":"user","content":"Is this house still available?"}"#
        );
    }

    #[test]
    fn system_message_is_tagged_system() {
        let msg = ChatMessage::system("You are a real estate expert");
        assert_eq!(msg.role, "system");
    }
}
