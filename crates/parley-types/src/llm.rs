//! Shapes exchanged with the remote completion capability.
//!
//! Provider adapters translate their wire formats to and from these; the
//! relay never sees a provider-specific type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of speakers. `System` is only ever synthesized per turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// One `{role, content}` entry of a prompt or a session history.
///
/// Content is never mutated after construction; history entries are
/// appended, not edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// One call to the remote model.
///
/// `messages` is the fully assembled prompt, system message included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub stream: bool,
}

/// Full reply of a blocking call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ContentFilter,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndTurn => write!(f, "end_turn"),
            StopReason::MaxTokens => write!(f, "max_tokens"),
            StopReason::ContentFilter => write!(f, "content_filter"),
        }
    }
}

/// Token counts as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Items of a provider stream. Only `TextDelta` carries reply text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Connected,

    /// An incremental fragment of the assistant's reply.
    TextDelta { text: String },

    /// Sent once, just before `Done`, when the provider reports why it stopped.
    MessageDelta { stop_reason: StopReason },

    Usage(Usage),

    Done,
}

/// Provider failure.
///
/// Variants split into two families: the provider answered with a
/// non-success status (`Api`, `RateLimited`, `AuthenticationFailed`,
/// `InvalidRequest`), or talking to it failed (`Transport`, `Stream`,
/// `Deserialization`). See [`LlmError::is_transport`].
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Non-success status with the provider's own error code and message.
    #[error("{code} - {message}")]
    Api { code: String, message: String },

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl LlmError {
    /// Whether the failure happened while communicating with the provider,
    /// as opposed to the provider rejecting the request.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LlmError::Transport(_) | LlmError::Stream(_) | LlmError::Deserialization(_)
        )
    }

    /// Machine-readable code for provider-side failures.
    pub fn code(&self) -> &str {
        match self {
            LlmError::Api { code, .. } => code,
            LlmError::RateLimited { .. } => "rate_limited",
            LlmError::AuthenticationFailed => "authentication_failed",
            LlmError::InvalidRequest(_) => "invalid_request",
            LlmError::Transport(_) => "transport",
            LlmError::Stream(_) => "stream",
            LlmError::Deserialization(_) => "deserialization",
        }
    }
}

/// Static limits advertised by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub streaming: bool,
    pub max_context_tokens: u32,
    pub max_output_tokens: u32,
}
