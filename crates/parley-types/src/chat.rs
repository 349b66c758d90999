//! Chat session identifiers, relay events, and reply payloads.
//!
//! These are the shapes exchanged between the relay core and its callers:
//! the opaque [`SessionId`], the streamed [`ChatEvent`] sequence, and the
//! JSON payloads returned for blocking turns, history retrieval, and
//! session deletion.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// Re-export the message types (they're used in both chat and llm contexts).
pub use crate::llm::{Message, MessageRole};

/// Opaque session identifier.
///
/// Generated ids are UUID v7 strings, but any client-supplied string is a
/// valid id: the store creates history for unknown ids on first write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Allocate a fresh, time-sortable session id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Events delivered to the caller of a streaming turn.
///
/// A well-formed stream is zero or more `Chunk`s followed by exactly one
/// terminal event (`Done` or `Error`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// An incremental fragment of the assistant reply.
    Chunk { content: String },
    /// The turn completed and was committed to history.
    Done { session_id: SessionId },
    /// The turn failed; history is unchanged.
    Error { error: String },
}

impl ChatEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChatEvent::Chunk { .. })
    }
}

/// Reply for a blocking turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub session_id: SessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TurnReply {
    pub fn completed(session_id: SessionId, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            session_id,
            error: None,
        }
    }

    pub fn failed(session_id: SessionId, error: String) -> Self {
        Self {
            success: false,
            message: None,
            session_id,
            error: Some(error),
        }
    }
}

/// Reply for an explicit session creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    pub success: bool,
    pub session_id: SessionId,
}

/// Reply for a history retrieval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Message>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistoryReply {
    pub fn found(history: Vec<Message>) -> Self {
        Self {
            success: true,
            count: Some(history.len()),
            history: Some(history),
            error: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            success: false,
            history: None,
            count: None,
            error: Some("not found".to_string()),
        }
    }
}

/// Reply for session deletion and clearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReply {
    pub success: bool,
}
